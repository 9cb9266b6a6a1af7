//! The contract between generated proxies and the registry.

use std::any::Any;
use std::sync::{Arc, Weak};

use tether_events::Subscriber;
use tracing::trace;

/// A generated subscriber that forwards events to a weakly held target.
///
/// Implemented by the code `#[weak_subscriber]` emits; there is rarely a
/// reason to implement it by hand.
pub trait WeakProxy: Subscriber + Sized {
    /// The subscriber type events are forwarded to.
    type Target: Any + Send + Sync;

    /// Name of the proxy type.
    const NAME: &'static str;

    /// Build a proxy holding only a weak reference to `target`.
    fn wrap(target: &Arc<Self::Target>) -> Self;
}

/// Forward one event to `target` if it is still alive.
///
/// Called from generated forwarding methods. A reclaimed target is not an
/// error: the event is dropped.
pub fn forward<T, F>(target: &Weak<T>, proxy: &'static str, method: &'static str, deliver: F)
where
    T: ?Sized,
    F: FnOnce(&T),
{
    match target.upgrade() {
        Some(target) => deliver(target.as_ref()),
        None => trace!(proxy, method, "Subscriber reclaimed, event dropped"),
    }
}
