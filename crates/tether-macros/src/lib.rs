//! Attribute macros for Tether subscribers.
//!
//! Both macros are thin wrappers over `tether-codegen`; use them through
//! the re-exports in the `tether` crate.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

extern crate proc_macro;

use proc_macro::TokenStream;

/// Implements `Subscriber` for an `impl` block.
///
/// Every method marked `#[subscribe]` becomes a handler for the type its
/// single `&E` parameter refers to. Add `#[allow_concurrent_events]` to let
/// the engine call a handler while other deliveries to the same instance
/// are in flight.
///
/// ```ignore
/// #[tether::subscriber]
/// impl Audit {
///     #[subscribe]
///     fn on_login(&self, event: &Login) { /* ... */ }
/// }
/// ```
///
/// `#[subscriber(crate = path)]` changes the path used to reach `tether`.
#[proc_macro_attribute]
pub fn subscriber(attr: TokenStream, item: TokenStream) -> TokenStream {
    tether_codegen::expand_subscriber(attr.into(), item.into()).into()
}

/// Generates a weak forwarding proxy for an `impl` block.
///
/// Methods marked `#[weak_subscribe]` are forwarded by a generated proxy
/// that holds the subscriber through a `Weak`. Register instances with
/// `WeakRegistry::register`. `#[weak_allow_concurrent_events]` carries over
/// to the proxy as `#[allow_concurrent_events]`.
///
/// Mixing these markers with `#[subscribe]` in one block is an error.
///
/// ```ignore
/// #[tether::weak_subscriber]
/// impl Panel {
///     #[weak_subscribe]
///     fn on_theme(&self, theme: &Theme) { /* ... */ }
/// }
/// ```
#[proc_macro_attribute]
pub fn weak_subscriber(attr: TokenStream, item: TokenStream) -> TokenStream {
    tether_codegen::expand_weak_subscriber(attr.into(), item.into()).into()
}
