//! Background thread that sweeps a registry at a fixed interval.

use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, select};
use tracing::{debug, warn};

use crate::error::{WeakBusError, WeakResult};
use crate::registry::RegistryInner;

/// Handle to a running reaper thread. Dropping it stops the thread.
pub(crate) struct Reaper {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Reaper {
    /// Start sweeping `registry` every `interval` on a thread called `name`.
    ///
    /// The thread holds the registry weakly and exits once it is gone.
    pub(crate) fn spawn(
        registry: Weak<RegistryInner>,
        interval: Duration,
        name: &str,
    ) -> WeakResult<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(&registry, &shutdown_rx, interval))
            .map_err(WeakBusError::Reaper)?;

        debug!(thread = name, interval_ms = interval.as_millis(), "Reaper started");
        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }
}

fn run(registry: &Weak<RegistryInner>, shutdown: &Receiver<()>, interval: Duration) {
    loop {
        select! {
            // Only ever disconnected, never sent to.
            recv(shutdown) -> _ => break,
            default(interval) => {
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let removed = registry.sweep();
                if removed > 0 {
                    debug!(removed, "Reaper swept stale registrations");
                }
            },
        }
    }
    debug!("Reaper stopped");
}

impl Drop for Reaper {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        let Some(handle) = self.handle.take() else {
            return;
        };
        // A sweep may release the last handle to a bus, running arbitrary
        // subscriber drops on the reaper thread, including this one.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!("Reaper thread panicked");
        }
    }
}
