//! Tether - Weak event subscriptions.
//!
//! This crate provides:
//! - [`WeakRegistry`], which registers subscribers with an [`EventBus`]
//!   without keeping them alive
//! - The `#[weak_subscriber]` attribute that generates the forwarding proxy
//!   a type needs to be registered weakly
//! - The strong engine itself, re-exported as [`events`], and its native
//!   `#[subscriber]` attribute
//!
//! # Architecture
//!
//! The bus holds every subscriber strongly. To subscribe weakly, the
//! registry builds a small proxy that holds only a [`Weak`](std::sync::Weak)
//! to the subscriber and registers the proxy instead. The proxy forwards
//! each event while the subscriber is alive and silently drops it
//! afterwards. [`WeakRegistry::sweep`] (or the reaper thread, see
//! [`WeakRegistryConfig`]) removes proxies whose subscriber is gone.
//!
//! Proxy types are generated at compile time and installed in the global
//! [`ProxyCatalog`] at process start, so `register` can find the proxy for
//! any annotated type by its `TypeId`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether::{EventBus, WeakRegistry};
//!
//! struct Panel;
//!
//! #[tether::weak_subscriber]
//! impl Panel {
//!     #[weak_subscribe]
//!     fn on_theme(&self, theme: &Theme) {
//!         // ...
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let registry = WeakRegistry::new();
//! let panel = Arc::new(Panel);
//! registry.register(&panel, &bus)?;
//!
//! bus.post(Theme::Dark); // delivered
//! drop(panel);
//! registry.sweep(); // proxy removed from the bus
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod catalog;
mod config;
mod error;
mod proxy;
mod reaper;
mod registry;
mod watch;

pub use tether_events as events;
pub use tether_events::{
    Concurrency, DeadEvent, EventBus, EventBusError, Subscriber, Subscription, WeakEventBus,
};
pub use tether_macros::{subscriber, weak_subscriber};

pub use catalog::{ProxyCatalog, ProxyEntry};
pub use config::{
    ConfigError, ConfigResult, ENV_REAPER_THREAD_NAME, ENV_SWEEP_INTERVAL_MS, WeakRegistryConfig,
};
pub use error::{WeakBusError, WeakResult};
pub use proxy::{WeakProxy, forward};
pub use registry::WeakRegistry;

#[doc(hidden)]
pub mod __private {
    pub use ctor;

    /// Claimed by every `#[weak_subscriber]` type and, through the blanket
    /// impl below, by every native [`Subscriber`](crate::Subscriber).
    ///
    /// A type with both a weak and a native subscriber block gets two
    /// conflicting impls and fails to compile, even when the blocks are in
    /// different modules.
    ///
    /// ```rust,compile_fail,E0119
    /// struct Mixed;
    ///
    /// #[tether::weak_subscriber]
    /// impl Mixed {
    ///     #[weak_subscribe]
    ///     fn on_weak(&self, _value: &i64) {}
    /// }
    ///
    /// #[tether::subscriber]
    /// impl Mixed {
    ///     #[subscribe]
    ///     fn on_strong(&self, _value: &i64) {}
    /// }
    /// # fn main() {}
    /// ```
    pub trait WeakSubscriberOnly {}

    impl<T: crate::Subscriber + ?Sized> WeakSubscriberOnly for T {}
}
