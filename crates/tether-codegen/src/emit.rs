//! Token emission for proxy types.

use proc_macro2::TokenStream;
use quote::quote;
use serde::{Deserialize, Serialize};
use syn::parse::Parser;
use syn::{Ident, Path, Type};

use crate::model::{Placement, ProxyTypeDescriptor, SubscriberMethod};
use crate::validate::{Diagnostic, InvalidDeclaration};

/// Path of the runtime crate used when none is configured.
pub const DEFAULT_RUNTIME_PATH: &str = "::tether";

/// Options controlling emitted code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    /// Path through which generated code reaches the `tether` crate.
    pub runtime_path: String,
    /// Where the generated code will be placed.
    pub placement: Placement,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            runtime_path: DEFAULT_RUNTIME_PATH.to_string(),
            placement: Placement::Module,
        }
    }
}

impl EmitOptions {
    /// Options for code placed in the module of the subscriber type.
    #[must_use]
    pub fn module() -> Self {
        Self::default()
    }

    /// Options for code included anywhere in the subscriber's crate.
    #[must_use]
    pub fn crate_wide() -> Self {
        Self {
            placement: Placement::Crate,
            ..Self::default()
        }
    }

    /// Use `path` to reach the runtime crate.
    #[must_use]
    pub fn with_runtime_path(mut self, path: impl Into<String>) -> Self {
        self.runtime_path = path.into();
        self
    }
}

/// Parse the optional `crate = path` argument shared by the subscriber
/// attribute macros.
///
/// # Errors
///
/// Returns an error for any other argument.
pub fn parse_runtime_arg(args: TokenStream) -> syn::Result<Path> {
    let mut runtime: Option<Path> = None;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("crate") {
            runtime = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported argument, expected `crate = path`"))
        }
    });
    parser.parse2(args)?;
    Ok(runtime.unwrap_or_else(|| syn::parse_quote!(::tether)))
}

/// Emit the proxy type described by `desc`.
///
/// The output declares the proxy struct, its constructor, a native
/// `#[subscriber]` impl with one forwarding method per subscriber method,
/// the `WeakProxy` impl, and a start-up hook installing the proxy in the
/// global catalog. It also claims `WeakSubscriberOnly` for the subscriber
/// type, which collides with the runtime's blanket impl for native
/// subscribers if the type also has a `#[subscriber]` block anywhere.
///
/// # Errors
///
/// Returns a diagnostic if a name in the descriptor is not valid Rust.
pub fn emit_proxy(
    desc: &ProxyTypeDescriptor,
    options: &EmitOptions,
) -> Result<TokenStream, Diagnostic> {
    let class = desc.class.qualified_name.as_str();
    let unparseable = |what: &str, method: Option<&str>| {
        Diagnostic::error(
            class,
            method,
            InvalidDeclaration::Unparseable(what.to_string()),
        )
    };

    let runtime: Path = syn::parse_str(&options.runtime_path)
        .map_err(|_| unparseable(&options.runtime_path, None))?;
    let proxy: Ident = syn::parse_str(&desc.name).map_err(|_| unparseable(&desc.name, None))?;
    let target: Type = syn::parse_str(class).map_err(|_| unparseable(class, None))?;
    let proxy_name = desc.name.as_str();

    let forwards = desc
        .methods
        .iter()
        .map(|m| {
            forward_method(m, &runtime, proxy_name)
                .map_err(|what| unparseable(&what, Some(&m.name)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(quote! {
        #[allow(non_camel_case_types)]
        #[doc(hidden)]
        struct #proxy {
            target: ::std::sync::Weak<#target>,
        }

        impl #proxy {
            fn new(target: &::std::sync::Arc<#target>) -> Self {
                Self {
                    target: ::std::sync::Arc::downgrade(target),
                }
            }
        }

        #[#runtime::subscriber(crate = #runtime)]
        impl #proxy {
            #(#forwards)*
        }

        impl #runtime::__private::WeakSubscriberOnly for #target {}

        impl #runtime::WeakProxy for #proxy {
            type Target = #target;

            const NAME: &'static str = #proxy_name;

            fn wrap(target: &::std::sync::Arc<#target>) -> Self {
                Self::new(target)
            }
        }

        #[#runtime::__private::ctor::ctor(unsafe, anonymous, crate_path = #runtime::__private::ctor)]
        fn __tether_install_proxy() {
            #runtime::ProxyCatalog::global().install(#runtime::ProxyEntry::of::<#proxy>());
        }
    })
}

fn forward_method(
    method: &SubscriberMethod,
    runtime: &Path,
    proxy_name: &str,
) -> Result<TokenStream, String> {
    let name: Ident = syn::parse_str(&method.name).map_err(|_| method.name.clone())?;
    let event = method.event_type().unwrap_or_default();
    let event_ty: Type = syn::parse_str(event).map_err(|_| event.to_string())?;
    let method_name = method.name.as_str();
    let concurrent = method
        .is_concurrent()
        .then(|| quote!(#[allow_concurrent_events]));

    Ok(quote! {
        #[subscribe]
        #concurrent
        fn #name(&self, event: &#event_ty) {
            #runtime::forward(&self.target, #proxy_name, #method_name, |target| {
                target.#name(event);
            });
        }
    })
}
