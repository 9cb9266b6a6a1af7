//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tether_events::prelude::*;` to import all essential types.

// Event bus
pub use crate::{BusId, EventBus, WeakEventBus};

// Events
pub use crate::DeadEvent;

// Subscriber system
pub use crate::{Concurrency, InstanceId, Subscriber, Subscription};

// Errors
pub use crate::{EventBusError, EventBusResult};
