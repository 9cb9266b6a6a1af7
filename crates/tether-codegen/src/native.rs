//! Expansion of the native `#[subscriber]` attribute.
//!
//! Every `#[subscribe]` method of the annotated `impl` block becomes one
//! `Subscription` in a generated `Subscriber` impl. `#[allow_concurrent_events]` marks the
//! handler as concurrent. The markers are removed from the emitted block.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{FnArg, Ident, ImplItem, ItemImpl, Path, Signature, Type};

use crate::emit::parse_runtime_arg;
use crate::model::ParamKind;
use crate::scan::{
    classify_param, markers_of, returns_value, scan_impl, strip_markers, type_string,
};

struct Handler {
    method: Ident,
    event: Type,
    concurrent: bool,
}

/// Expand `#[subscriber]` on `item`.
///
/// Errors are returned as `compile_error!` invocations next to the
/// unmodified block.
#[must_use]
pub fn expand_subscriber(args: TokenStream, item: TokenStream) -> TokenStream {
    let mut item: ItemImpl = match syn::parse2(item) {
        Ok(item) => item,
        Err(e) => return e.to_compile_error(),
    };

    match expand(args, &item) {
        Ok(subscriber_impl) => {
            strip_markers(&mut item);
            quote! {
                #item
                #subscriber_impl
            }
        },
        Err(e) => {
            strip_markers(&mut item);
            let errors = e.to_compile_error();
            quote! {
                #item
                #errors
            }
        }
    }
}

fn expand(args: TokenStream, item: &ItemImpl) -> syn::Result<TokenStream> {
    let runtime = parse_runtime_arg(args)?;
    // Rejects trait impls, generic impls and non-path self types.
    scan_impl(item)?;
    let handlers = collect_handlers(item)?;

    let events = quote!(#runtime::events);
    let self_ty = &item.self_ty;
    let name = type_string(self_ty);
    let subscriptions = handlers.iter().map(|h| subscription(h, &runtime));

    Ok(quote! {
        impl #events::Subscriber for #self_ty {
            fn subscriptions(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::vec::Vec<#events::Subscription> {
                ::std::vec![#(#subscriptions),*]
            }

            fn name(&self) -> &str {
                #name
            }
        }
    })
}

fn subscription(handler: &Handler, runtime: &Path) -> TokenStream {
    let Handler {
        method,
        event,
        concurrent,
    } = handler;
    let method_name = method.to_string();
    let concurrency = if *concurrent {
        quote!(#runtime::events::Concurrency::Concurrent)
    } else {
        quote!(#runtime::events::Concurrency::Serialized)
    };

    quote! {
        {
            let this = ::std::sync::Arc::clone(&self);
            #runtime::events::Subscription::new::<#event, _>(
                #method_name,
                #concurrency,
                move |event: &#event| this.#method(event),
            )
        }
    }
}

fn collect_handlers(item: &ItemImpl) -> syn::Result<Vec<Handler>> {
    let mut handlers = Vec::new();
    let mut errors = Vec::new();

    for impl_item in &item.items {
        let ImplItem::Fn(func) = impl_item else {
            continue;
        };
        let markers = markers_of(&func.attrs);
        if markers.has_weak() {
            errors.push(syn::Error::new_spanned(
                &func.sig.ident,
                "weak subscriber markers cannot be mixed with `#[subscribe]`; use `#[weak_subscriber]` on this impl instead",
            ));
            continue;
        }
        if !markers.native_subscribe {
            continue;
        }

        match handler_of(&func.sig) {
            Ok(event) => handlers.push(Handler {
                method: func.sig.ident.clone(),
                event,
                concurrent: markers.native_concurrent,
            }),
            Err(e) => errors.push(e),
        }
    }

    let mut errors = errors.into_iter();
    match errors.next() {
        None => Ok(handlers),
        Some(mut first) => {
            for e in errors {
                first.combine(e);
            }
            Err(first)
        }
    }
}

fn handler_of(sig: &Signature) -> syn::Result<Type> {
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "subscriber methods cannot be `async`",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "subscriber methods cannot be generic",
        ));
    }

    if returns_value(&sig.output) {
        return Err(syn::Error::new_spanned(
            &sig.output,
            "subscriber methods must return `()`",
        ));
    }

    let receiver_ok = sig.receiver().is_some_and(|r| {
        matches!(&*r.ty, Type::Reference(reference) if reference.mutability.is_none())
    });
    if !receiver_ok {
        return Err(syn::Error::new_spanned(
            &sig.ident,
            "subscriber methods must take `&self`",
        ));
    }

    let params: Vec<&Type> = sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pat) => Some(&*pat.ty),
            FnArg::Receiver(_) => None,
        })
        .collect();
    let [param] = params.as_slice() else {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            "subscriber methods must take exactly one event parameter",
        ));
    };

    if classify_param(param).kind != ParamKind::Object {
        return Err(syn::Error::new_spanned(
            param,
            "event parameter must be a shared reference to a named type, e.g. `&MyEvent`",
        ));
    }
    match param {
        Type::Reference(reference) => Ok((*reference.elem).clone()),
        other => Err(syn::Error::new_spanned(
            other,
            "event parameter must be a shared reference to a named type, e.g. `&MyEvent`",
        )),
    }
}
