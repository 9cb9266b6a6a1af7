//! Test harness helpers.

use std::thread;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

/// Set up test logging with the given filter.
///
/// Safe to call from every test; only the first call installs a subscriber.
///
/// # Example
///
/// ```rust,ignore
/// use tether_test::init_test_tracing_with;
///
/// #[test]
/// fn my_test() {
///     init_test_tracing_with("tether=trace");
///     // ... test code
/// }
/// ```
pub fn init_test_tracing_with(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Set up test logging, honouring `RUST_LOG` and defaulting to `warn`.
pub fn init_test_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    init_test_tracing_with(&filter);
}

/// Poll `condition` every few milliseconds until it holds or `timeout`
/// elapses. Returns whether it held.
///
/// For behavior with no timing guarantee, such as the reaper thread.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let Some(deadline) = Instant::now().checked_add(timeout) else {
        return condition();
    };
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}
