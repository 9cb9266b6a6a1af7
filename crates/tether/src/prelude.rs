//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tether::prelude::*;` to import all essential types.

// Engine
pub use crate::{Concurrency, DeadEvent, EventBus, Subscriber, Subscription, WeakEventBus};

// Weak registration
pub use crate::{ProxyCatalog, ProxyEntry, WeakProxy, WeakRegistry, WeakRegistryConfig};

// Macros
pub use crate::{subscriber, weak_subscriber};

// Errors
pub use crate::{EventBusError, WeakBusError, WeakResult};
