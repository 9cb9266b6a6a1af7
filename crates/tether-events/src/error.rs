//! Event bus error types.

use thiserror::Error;

/// Errors raised by the event bus when it refuses a registration change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventBusError {
    /// The same subscriber instance is already registered on this bus.
    #[error("Subscriber '{subscriber}' is already registered")]
    AlreadyRegistered {
        /// Name reported by the subscriber.
        subscriber: String,
    },

    /// The subscriber instance is not registered on this bus.
    #[error("Subscriber '{subscriber}' is not registered")]
    NotRegistered {
        /// Name reported by the subscriber.
        subscriber: String,
    },
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_registered_message() {
        let err = EventBusError::AlreadyRegistered {
            subscriber: "audit".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("audit"));
        assert!(msg.contains("already registered"));
    }

    #[test]
    fn test_not_registered_message() {
        let err = EventBusError::NotRegistered {
            subscriber: "audit".to_string(),
        };
        assert!(err.to_string().contains("not registered"));
    }
}
