//! Weak registration error types.

use thiserror::Error;

use tether_events::EventBusError;

/// Errors raised by [`WeakRegistry`](crate::WeakRegistry).
#[derive(Debug, Error)]
pub enum WeakBusError {
    /// No proxy type was generated for the subscriber's type.
    #[error(
        "No weak proxy available for '{subscriber}'; annotate its impl block with #[weak_subscriber]"
    )]
    NoProxyAvailable {
        /// Type name of the subscriber.
        subscriber: String,
    },

    /// The event bus refused to add or remove the proxy.
    #[error("Event bus rejected the weak proxy: {0}")]
    EngineRejection(#[from] EventBusError),

    /// The reaper thread could not be started.
    #[error("Failed to start reaper thread: {0}")]
    Reaper(#[source] std::io::Error),
}

/// Result type for weak registration.
pub type WeakResult<T> = Result<T, WeakBusError>;
