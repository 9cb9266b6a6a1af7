//! Built-in events published by the bus itself.

/// Wraps an event that was posted while no handler accepted its type.
///
/// Subscribing to `DeadEvent` is useful to spot misrouted events or
/// subscribers that were never registered. A `DeadEvent` that nobody handles
/// is dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadEvent {
    event_type: &'static str,
}

impl DeadEvent {
    pub(crate) const fn new(event_type: &'static str) -> Self {
        Self { event_type }
    }

    /// Type name of the undelivered event.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        self.event_type
    }
}
