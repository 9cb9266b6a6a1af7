//! Tether Events - Strong-reference event bus.
//!
//! This crate provides:
//! - The [`Subscriber`] trait and typed [`Subscription`] handlers
//! - An [`EventBus`] that matches posted events to handlers by exact type
//! - Per-instance serialization of handlers unless they opt into concurrency
//!
//! # Architecture
//!
//! A subscriber instance is registered with `bus.register_instance(arc)`.
//! The bus asks it for its subscriptions once, indexes them by event
//! `TypeId`, and keeps the instance alive until `deregister_instance` is
//! called with the same `Arc`. Identity is the `Arc` allocation, so two
//! clones of one `Arc` are the same subscriber.
//!
//! Posting is synchronous: `bus.post(event)` runs every matching handler on
//! the calling thread, in registration order, before returning. Events
//! nobody handles are re-posted wrapped in a [`DeadEvent`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use tether_events::{Concurrency, EventBus, Subscriber, Subscription};
//!
//! struct Totals(AtomicU64);
//!
//! impl Subscriber for Totals {
//!     fn subscriptions(self: Arc<Self>) -> Vec<Subscription> {
//!         vec![Subscription::new::<u64, _>("add", Concurrency::Serialized, move |n| {
//!             self.0.fetch_add(*n, Ordering::SeqCst);
//!         })]
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let totals = Arc::new(Totals(AtomicU64::new(0)));
//! bus.register_instance(Arc::clone(&totals)).unwrap();
//!
//! bus.post(5_u64);
//! assert_eq!(totals.0.load(Ordering::SeqCst), 5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod error;
mod event;
mod subscriber;

pub use bus::{BusId, EventBus, WeakEventBus};
pub use error::{EventBusError, EventBusResult};
pub use event::DeadEvent;
pub use subscriber::{Concurrency, InstanceId, Subscriber, Subscription};
