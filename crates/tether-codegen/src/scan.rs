//! Declaration scanning from Rust syntax.
//!
//! Turns an `impl` block into a [`SubscriberClassDecl`]. Only methods that
//! carry at least one subscriber marker are recorded; everything else in
//! the block is left alone.

use proc_macro2::Span;
use quote::ToTokens;
use syn::spanned::Spanned;
use syn::{
    Attribute, ImplItem, ImplItemFn, ItemImpl, PathArguments, ReturnType, Signature, Type,
};

use crate::model::{Markers, Param, Receiver, SubscriberClassDecl, SubscriberMethod, Visibility};

/// Weak subscribe marker.
pub const WEAK_SUBSCRIBE: &str = "weak_subscribe";
/// Weak concurrency marker.
pub const WEAK_CONCURRENT: &str = "weak_allow_concurrent_events";
/// Native subscribe marker.
pub const NATIVE_SUBSCRIBE: &str = "subscribe";
/// Native concurrency marker.
pub const NATIVE_CONCURRENT: &str = "allow_concurrent_events";

const ALL_MARKERS: [&str; 4] = [
    WEAK_SUBSCRIBE,
    WEAK_CONCURRENT,
    NATIVE_SUBSCRIBE,
    NATIVE_CONCURRENT,
];

/// A scanned `impl` block with the spans needed to point diagnostics back
/// at the source.
#[derive(Debug, Clone)]
pub struct ScannedImpl {
    /// The declaration.
    pub decl: SubscriberClassDecl,
    type_span: Span,
    method_spans: Vec<(String, Span)>,
}

impl ScannedImpl {
    /// Span of `method`, or of the subscriber type when `method` is `None`
    /// or unknown.
    #[must_use]
    pub fn span_of(&self, method: Option<&str>) -> Span {
        method
            .and_then(|name| {
                self.method_spans
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, span)| *span)
            })
            .unwrap_or(self.type_span)
    }
}

/// Scan an inherent, non-generic `impl` block.
///
/// # Errors
///
/// Returns an error for trait impls, generic impls, and self types that are
/// not plain paths.
pub fn scan_impl(item: &ItemImpl) -> syn::Result<ScannedImpl> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "subscriber methods must be declared in an inherent `impl` block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "generic subscriber types are not supported",
        ));
    }

    let (qualified_name, package) = type_names(&item.self_ty)?;
    let mut decl = SubscriberClassDecl::new(qualified_name, package);
    let mut method_spans = Vec::new();

    for impl_item in &item.items {
        let ImplItem::Fn(func) = impl_item else {
            continue;
        };
        let markers = markers_of(&func.attrs);
        if !markers.has_weak() && !markers.has_native() {
            continue;
        }

        method_spans.push((func.sig.ident.to_string(), func.sig.ident.span()));
        decl.methods
            .push(scan_method(&decl.qualified_name, func, markers));
    }

    Ok(ScannedImpl {
        decl,
        type_span: item.self_ty.span(),
        method_spans,
    })
}

fn scan_method(owner: &str, func: &ImplItemFn, markers: Markers) -> SubscriberMethod {
    let sig = &func.sig;
    let params = sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            syn::FnArg::Typed(pat) => Some(classify_param(&pat.ty)),
            syn::FnArg::Receiver(_) => None,
        })
        .collect();

    SubscriberMethod {
        owner: owner.to_string(),
        name: sig.ident.to_string(),
        params,
        receiver: receiver_of(sig),
        visibility: visibility_of(&func.vis),
        markers,
        is_async: sig.asyncness.is_some(),
        is_generic: !sig.generics.params.is_empty(),
        returns_value: returns_value(&sig.output),
    }
}

/// Whether `output` is anything but `()`.
#[must_use]
pub fn returns_value(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => {
            !matches!(ungroup(ty), Type::Tuple(unit) if unit.elems.is_empty())
        },
    }
}

/// Subscriber markers present in `attrs`.
#[must_use]
pub fn markers_of(attrs: &[Attribute]) -> Markers {
    let has = |name: &str| attrs.iter().any(|a| a.path().is_ident(name));
    Markers {
        weak_subscribe: has(WEAK_SUBSCRIBE),
        weak_concurrent: has(WEAK_CONCURRENT),
        native_subscribe: has(NATIVE_SUBSCRIBE),
        native_concurrent: has(NATIVE_CONCURRENT),
    }
}

/// Remove every subscriber marker from the methods of `item`.
pub fn strip_markers(item: &mut ItemImpl) {
    for impl_item in &mut item.items {
        if let ImplItem::Fn(func) = impl_item {
            func.attrs
                .retain(|a| !ALL_MARKERS.iter().any(|m| a.path().is_ident(m)));
        }
    }
}

/// Classify a parameter type.
///
/// `&E` with `E` a named type is an object parameter accepting `E`.
/// Everything else is primitive.
#[must_use]
pub fn classify_param(ty: &Type) -> Param {
    let Type::Reference(reference) = ungroup(ty) else {
        return Param::primitive(type_string(ty));
    };
    match ungroup(&reference.elem) {
        Type::Path(path)
            if reference.mutability.is_none()
                && path.qself.is_none()
                && !path.path.is_ident("str") =>
        {
            Param::object(type_string(path))
        },
        _ => Param::primitive(type_string(ty)),
    }
}

/// Render tokens as a compact type string that parses back to the same
/// type.
pub fn type_string(tokens: &impl ToTokens) -> String {
    tokens
        .to_token_stream()
        .to_string()
        .replace(" :: ", "::")
        .replace(":: ", "::")
        .replace(" <", "<")
        .replace("< ", "<")
        .replace(" >", ">")
        .replace(" ,", ",")
        .replace("& ", "&")
}

fn type_names(self_ty: &Type) -> syn::Result<(String, String)> {
    let Type::Path(path) = ungroup(self_ty) else {
        return Err(syn::Error::new_spanned(
            self_ty,
            "subscriber type must be a named struct or enum",
        ));
    };
    if path.qself.is_some() {
        return Err(syn::Error::new_spanned(
            self_ty,
            "subscriber type must be a named struct or enum",
        ));
    }
    if let Some(seg) = path
        .path
        .segments
        .iter()
        .find(|seg| !matches!(seg.arguments, PathArguments::None))
    {
        return Err(syn::Error::new_spanned(
            seg,
            "generic subscriber types are not supported",
        ));
    }

    let lead = if path.path.leading_colon.is_some() {
        "::"
    } else {
        ""
    };
    let segments: Vec<String> = path
        .path
        .segments
        .iter()
        .map(|seg| seg.ident.to_string())
        .collect();

    let qualified = format!("{lead}{}", segments.join("::"));
    let package = match segments.split_last() {
        Some((_, [])) | None => String::new(),
        Some((_, parents)) => format!("{lead}{}", parents.join("::")),
    };
    Ok((qualified, package))
}

fn receiver_of(sig: &Signature) -> Receiver {
    let Some(receiver) = sig.receiver() else {
        return Receiver::None;
    };
    match ungroup(&receiver.ty) {
        Type::Reference(r) if r.mutability.is_some() => Receiver::Exclusive,
        Type::Reference(_) => Receiver::Shared,
        Type::Path(p) if p.path.segments.last().is_some_and(|s| s.ident == "Arc") => {
            Receiver::Arc
        },
        _ => Receiver::Owned,
    }
}

fn visibility_of(vis: &syn::Visibility) -> Visibility {
    match vis {
        syn::Visibility::Public(_) => Visibility::Public,
        syn::Visibility::Restricted(r) if r.path.is_ident("crate") => Visibility::Crate,
        syn::Visibility::Restricted(_) => Visibility::Restricted,
        syn::Visibility::Inherited => Visibility::Private,
    }
}

fn ungroup(ty: &Type) -> &Type {
    match ty {
        Type::Paren(inner) => ungroup(&inner.elem),
        Type::Group(inner) => ungroup(&inner.elem),
        _ => ty,
    }
}
