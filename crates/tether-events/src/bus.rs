//! Event bus for dispatching events to registered subscriber instances.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{EventBusError, EventBusResult};
use crate::event::DeadEvent;
use crate::subscriber::{Concurrency, InstanceId, Subscriber, Subscription};

/// Identity of one event bus, shared by all of its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(Uuid);

impl BusId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

thread_local! {
    /// Delivery gates currently held by this thread.
    static HELD_GATES: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Serializes deliveries to one subscriber instance.
///
/// A delivery nested inside another delivery to the same instance on the
/// same thread (a handler posting an event it also handles) runs inline
/// instead of waiting on itself.
#[derive(Default)]
struct DeliveryGate {
    lock: Mutex<()>,
}

impl DeliveryGate {
    fn run(&self, f: impl FnOnce()) {
        let key = std::ptr::from_ref(self).addr();
        let nested = HELD_GATES.with(|held| held.borrow().contains(&key));
        if nested {
            f();
            return;
        }

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        HELD_GATES.with(|held| held.borrow_mut().push(key));
        let result = catch_unwind(AssertUnwindSafe(f));
        HELD_GATES.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(pos) = held.iter().rposition(|k| *k == key) {
                held.remove(pos);
            }
        });
        if let Err(payload) = result {
            std::panic::resume_unwind(payload);
        }
    }
}

/// A registered handler with its owning instance.
struct Handler {
    owner: InstanceId,
    owner_name: Arc<str>,
    subscription: Subscription,
    gate: Option<Arc<DeliveryGate>>,
}

impl Handler {
    fn deliver(&self, event: &dyn Any) {
        match &self.gate {
            Some(gate) => gate.run(|| self.subscription.invoke(event)),
            None => self.subscription.invoke(event),
        }
    }
}

/// Bookkeeping for one registered instance.
struct Instance {
    name: Arc<str>,
    handler_count: usize,
    /// Keeps the allocation alive so its identity cannot be reused while
    /// registered, even when it declares no handlers.
    _keepalive: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct Index {
    instances: HashMap<InstanceId, Instance>,
    handlers: HashMap<TypeId, Vec<Arc<Handler>>>,
}

struct BusInner {
    id: BusId,
    index: RwLock<Index>,
}

/// Strong-reference event bus.
///
/// The bus owns every registered subscriber through the handlers it
/// stores. Cloning the bus is cheap and every clone shares the same
/// registrations.
///
/// **WARNING:** a subscriber that stores a clone of the bus it is
/// registered with creates an `Arc` cycle. Store a [`WeakEventBus`]
/// instead.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .inner
            .index
            .read()
            .map(|index| index.instances.len())
            .unwrap_or_default();
        f.debug_struct("EventBus")
            .field("id", &self.inner.id)
            .field("subscriber_count", &count)
            .finish()
    }
}

impl EventBus {
    /// Create an empty event bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                id: BusId::new(),
                index: RwLock::new(Index::default()),
            }),
        }
    }

    /// Identity of this bus.
    #[must_use]
    pub fn id(&self) -> BusId {
        self.inner.id
    }

    /// Obtain a handle that does not keep the bus alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Register every subscription of `subscriber`.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::AlreadyRegistered`] if this exact instance is
    /// already registered.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn register_instance<S>(&self, subscriber: Arc<S>) -> EventBusResult<()>
    where
        S: Subscriber + ?Sized,
    {
        let id = InstanceId::of(&subscriber);
        let name: Arc<str> = Arc::from(subscriber.name());

        // Collected before taking the lock: this runs subscriber code.
        let subscriptions = Arc::clone(&subscriber).subscriptions();
        let gate = Arc::new(DeliveryGate::default());

        let mut index = self.inner.index.write().expect("lock poisoned");
        if index.instances.contains_key(&id) {
            return Err(EventBusError::AlreadyRegistered {
                subscriber: name.to_string(),
            });
        }

        let handler_count = subscriptions.len();
        for subscription in subscriptions {
            let gate = match subscription.concurrency() {
                Concurrency::Serialized => Some(Arc::clone(&gate)),
                Concurrency::Concurrent => None,
            };
            index
                .handlers
                .entry(subscription.event_type())
                .or_default()
                .push(Arc::new(Handler {
                    owner: id,
                    owner_name: Arc::clone(&name),
                    subscription,
                    gate,
                }));
        }
        index.instances.insert(
            id,
            Instance {
                name: Arc::clone(&name),
                handler_count,
                _keepalive: Box::new(subscriber),
            },
        );
        drop(index);

        debug!(subscriber_name = %name, handler_count, "Subscriber registered");
        Ok(())
    }

    /// Remove every subscription of `subscriber`.
    ///
    /// Deliveries already in flight are not interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::NotRegistered`] if the instance is unknown.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn deregister_instance<S>(&self, subscriber: &Arc<S>) -> EventBusResult<()>
    where
        S: Subscriber + ?Sized,
    {
        let id = InstanceId::of(subscriber);

        let (instance, removed) = {
            let mut index = self.inner.index.write().expect("lock poisoned");
            let Some(instance) = index.instances.remove(&id) else {
                return Err(EventBusError::NotRegistered {
                    subscriber: subscriber.name().to_string(),
                });
            };

            let mut removed = Vec::with_capacity(instance.handler_count);
            index.handlers.retain(|_, list| {
                let (gone, kept): (Vec<_>, Vec<_>) =
                    std::mem::take(list).into_iter().partition(|h| h.owner == id);
                removed.extend(gone);
                *list = kept;
                !list.is_empty()
            });
            (instance, removed)
        };

        debug!(
            subscriber_name = %instance.name,
            handler_count = removed.len(),
            "Subscriber deregistered"
        );

        // Dropped outside the lock so subscriber drop code may use the bus.
        drop(removed);
        drop(instance);
        Ok(())
    }

    /// Check whether this exact instance is registered.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_registered<S>(&self, subscriber: &Arc<S>) -> bool
    where
        S: ?Sized,
    {
        let id = InstanceId::of(subscriber);
        self.inner
            .index
            .read()
            .expect("lock poisoned")
            .instances
            .contains_key(&id)
    }

    /// Post an event to every handler registered for its exact type.
    ///
    /// Handlers run on the calling thread, in registration order. A panic
    /// in one handler is logged and does not stop the others. If no handler
    /// accepts the event, a [`DeadEvent`] is posted instead.
    ///
    /// Returns the number of handlers the event was delivered to.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn post<E: Any>(&self, event: E) -> usize {
        let event_name = std::any::type_name::<E>();
        let delivered = self.dispatch(&event, TypeId::of::<E>(), event_name);

        if delivered == 0 && TypeId::of::<E>() != TypeId::of::<DeadEvent>() {
            trace!(event_type = event_name, "No handlers for event");
            let dead = DeadEvent::new(event_name);
            self.dispatch(&dead, TypeId::of::<DeadEvent>(), std::any::type_name::<DeadEvent>());
        }

        delivered
    }

    fn dispatch(&self, event: &dyn Any, event_type: TypeId, event_name: &str) -> usize {
        // Snapshot so handlers may register, deregister or post re-entrantly.
        let handlers: Vec<Arc<Handler>> = {
            let index = self.inner.index.read().expect("lock poisoned");
            index.handlers.get(&event_type).cloned().unwrap_or_default()
        };

        trace!(
            event_type = event_name,
            handler_count = handlers.len(),
            "Dispatching event"
        );

        for handler in &handlers {
            let result = catch_unwind(AssertUnwindSafe(|| handler.deliver(event)));
            if let Err(e) = result {
                warn!(
                    subscriber_name = %handler.owner_name,
                    method = handler.subscription.method(),
                    event_type = event_name,
                    error = ?e,
                    "Subscriber panicked"
                );
            }
        }

        handlers.len()
    }

    /// Number of registered subscriber instances.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.index.read().expect("lock poisoned").instances.len()
    }

    /// Number of handlers registered for events of type `E`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn handler_count<E: Any>(&self) -> usize {
        self.inner
            .index
            .read()
            .expect("lock poisoned")
            .handlers
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning handle to an [`EventBus`].
#[derive(Clone)]
pub struct WeakEventBus {
    id: BusId,
    inner: Weak<BusInner>,
}

impl WeakEventBus {
    /// Identity of the bus this handle points to.
    #[must_use]
    pub const fn id(&self) -> BusId {
        self.id
    }

    /// Recover the bus if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<EventBus> {
        self.inner.upgrade().map(|inner| EventBus { inner })
    }

    /// Whether some [`EventBus`] handle to this bus still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEventBus")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
