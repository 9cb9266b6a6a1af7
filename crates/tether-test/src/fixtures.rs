//! Test fixtures: buses, registries and a delivery log.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tether::{EventBus, WeakRegistry, WeakRegistryConfig};

/// Create a fresh event bus.
#[must_use]
pub fn test_bus() -> EventBus {
    EventBus::new()
}

/// Create a registry backed by the global proxy catalog, with no reaper.
#[must_use]
pub fn test_registry() -> WeakRegistry {
    WeakRegistry::new()
}

/// Create a registry whose reaper sweeps every `interval`.
///
/// # Panics
///
/// Panics if the reaper thread cannot be started.
#[must_use]
pub fn test_registry_with_reaper(interval: Duration) -> WeakRegistry {
    let config = WeakRegistryConfig::default()
        .with_sweep_interval(interval)
        .with_reaper_thread_name("tether-test-reaper");
    WeakRegistry::from_config(&config).expect("Failed to start reaper")
}

/// Shared, ordered record of deliveries.
///
/// Clones share the same log, so a subscriber can hold one clone while the
/// test asserts on another.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().expect("lock poisoned").push(entry.into());
    }

    /// Snapshot of all entries in recording order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().expect("lock poisoned").clone()
    }

    /// Number of entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        self.entries.lock().expect("lock poisoned").clear();
    }
}
