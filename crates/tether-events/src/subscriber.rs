//! Subscriber trait and typed handler descriptors.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Type-erased handler stored by the bus.
type ErasedHandler = Box<dyn Fn(&dyn Any) + Send + Sync>;

/// Trait for objects that can be registered with an [`EventBus`](crate::EventBus).
///
/// Implementations usually come from the `#[subscriber]` attribute macro,
/// which turns every `#[subscribe]` method of an `impl` block into a
/// [`Subscription`]. The bus calls [`Subscriber::subscriptions`] once per
/// registration; the returned handlers typically capture the `Arc`, which is
/// how the bus keeps its subscribers alive.
pub trait Subscriber: Send + Sync + 'static {
    /// Produce the handlers this instance wants registered.
    fn subscriptions(self: Arc<Self>) -> Vec<Subscription>;

    /// Optional name for debugging.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Whether a handler may run while other deliveries to the same subscriber
/// instance are in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Concurrency {
    /// Deliveries to this handler are serialized with every other serialized
    /// handler of the same instance.
    #[default]
    Serialized,
    /// The handler is thread-safe and is invoked without holding the
    /// instance's delivery lock.
    Concurrent,
}

impl Concurrency {
    /// Returns `true` for [`Concurrency::Concurrent`].
    #[must_use]
    pub const fn is_concurrent(self) -> bool {
        matches!(self, Self::Concurrent)
    }
}

/// One subscriber method bound to the event type it accepts.
pub struct Subscription {
    method: &'static str,
    event_type: TypeId,
    event_name: &'static str,
    concurrency: Concurrency,
    handler: ErasedHandler,
}

impl Subscription {
    /// Create a subscription for events of type `E`.
    ///
    /// `method` is only used for diagnostics.
    pub fn new<E, F>(method: &'static str, concurrency: Concurrency, handler: F) -> Self
    where
        E: Any,
        F: Fn(&E) + Send + Sync + 'static,
    {
        Self {
            method,
            event_type: TypeId::of::<E>(),
            event_name: std::any::type_name::<E>(),
            concurrency,
            handler: Box::new(move |event: &dyn Any| {
                if let Some(event) = event.downcast_ref::<E>() {
                    handler(event);
                }
            }),
        }
    }

    /// Name of the subscriber method.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        self.method
    }

    /// `TypeId` of the accepted event.
    #[must_use]
    pub const fn event_type(&self) -> TypeId {
        self.event_type
    }

    /// Type name of the accepted event.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        self.event_name
    }

    /// Concurrency marking of the handler.
    #[must_use]
    pub const fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    pub(crate) fn invoke(&self, event: &dyn Any) {
        (self.handler)(event);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("method", &self.method)
            .field("event_name", &self.event_name)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Identity of a subscriber instance: the address of its `Arc` allocation.
///
/// Clones of one `Arc` share an id. An id is only meaningful while some
/// strong or weak reference keeps the allocation around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(usize);

impl InstanceId {
    /// Identity of the instance behind `instance`.
    #[must_use]
    pub fn of<S: ?Sized>(instance: &Arc<S>) -> Self {
        Self(Arc::as_ptr(instance).cast::<()>().addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscription_invokes_matching_type() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let sub = Subscription::new::<u32, _>("count", Concurrency::Serialized, move |n| {
            hits_clone.fetch_add(*n as usize, Ordering::SeqCst);
        });

        assert_eq!(sub.event_type(), TypeId::of::<u32>());
        assert_eq!(sub.method(), "count");

        sub.invoke(&7_u32);
        assert_eq!(hits.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_subscription_ignores_other_types() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let sub = Subscription::new::<u32, _>("count", Concurrency::Concurrent, move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        sub.invoke(&"not a u32");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(sub.concurrency().is_concurrent());
    }

    #[test]
    fn test_instance_id_follows_allocation() {
        let a = Arc::new(1_u8);
        let b = Arc::clone(&a);
        let c = Arc::new(1_u8);

        assert_eq!(InstanceId::of(&a), InstanceId::of(&b));
        assert_ne!(InstanceId::of(&a), InstanceId::of(&c));

        let erased: Arc<dyn Any + Send + Sync> = a;
        assert_eq!(InstanceId::of(&erased), InstanceId::of(&b));
    }
}
