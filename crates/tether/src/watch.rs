//! Liveness watch over a weakly registered subscriber.

use std::any::Any;
use std::sync::{Arc, Weak};

/// Observes whether a subscriber is still alive without keeping it alive.
///
/// The watch keeps the subscriber's allocation (not its value) around, so
/// the address-based [`InstanceId`](tether_events::InstanceId) of a watched
/// subscriber cannot be reused by another one while the watch exists.
#[derive(Debug, Clone)]
pub(crate) struct ReachabilityWatch(Weak<dyn Any + Send + Sync>);

impl ReachabilityWatch {
    pub(crate) fn new<T: Any + Send + Sync>(subscriber: &Arc<T>) -> Self {
        let weak: Weak<T> = Arc::downgrade(subscriber);
        Self(weak)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}
