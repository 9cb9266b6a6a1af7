//! Weak registration table.
//!
//! Each registration pairs a subscriber (held weakly) with the bus its proxy
//! was registered on. The proxy itself is held strongly by the bus; the table
//! keeps a second handle so it can be deregistered later.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tether_events::{BusId, EventBus, InstanceId, Subscriber, WeakEventBus};
use tracing::{debug, trace, warn};

use crate::catalog::ProxyCatalog;
use crate::config::WeakRegistryConfig;
use crate::error::{WeakBusError, WeakResult};
use crate::reaper::Reaper;
use crate::watch::ReachabilityWatch;

/// Subscriber identity and bus identity.
type RegistrationKey = (InstanceId, BusId);

struct Registration {
    watch: ReachabilityWatch,
    proxy: Arc<dyn Subscriber>,
    bus: WeakEventBus,
    proxy_name: &'static str,
}

impl Registration {
    fn is_stale(&self) -> bool {
        !self.watch.is_alive() || !self.bus.is_alive()
    }

    /// Withdraw the proxy from its bus, if the bus still exists.
    fn retire(self) {
        let Some(bus) = self.bus.upgrade() else {
            trace!(proxy = self.proxy_name, "Bus already dropped, nothing to withdraw");
            return;
        };
        if let Err(e) = bus.deregister_instance(&self.proxy) {
            warn!(
                proxy = self.proxy_name,
                bus = %bus.id(),
                error = %e,
                "Failed to withdraw weak proxy"
            );
        }
    }
}

enum CatalogSource {
    Global,
    Custom(Arc<ProxyCatalog>),
}

pub(crate) struct RegistryInner {
    table: DashMap<RegistrationKey, Registration>,
    catalog: CatalogSource,
}

impl RegistryInner {
    fn catalog(&self) -> &ProxyCatalog {
        match &self.catalog {
            CatalogSource::Global => ProxyCatalog::global(),
            CatalogSource::Custom(catalog) => catalog,
        }
    }

    pub(crate) fn sweep(&self) -> usize {
        // Collected first: retiring runs bus code and must not hold a shard.
        let stale: Vec<RegistrationKey> = self
            .table
            .iter()
            .filter(|entry| entry.value().is_stale())
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0_usize;
        for key in stale {
            // Re-checked under the shard lock; a concurrent sweep or
            // unregister may have taken it already.
            if let Some((_, registration)) = self.table.remove_if(&key, |_, r| r.is_stale()) {
                registration.retire();
                removed = removed.saturating_add(1);
            }
        }

        if removed > 0 {
            debug!(removed, remaining = self.table.len(), "Swept stale weak registrations");
        }
        removed
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        let remaining = std::mem::take(&mut self.table);
        if !remaining.is_empty() {
            debug!(count = remaining.len(), "Withdrawing weak proxies of dropped registry");
        }
        for (_, registration) in remaining {
            registration.retire();
        }
    }
}

/// Registers subscribers with event buses without keeping them alive.
///
/// Registration is keyed by subscriber instance and bus, so one subscriber
/// can be registered with several buses. The bus keeps only a generated
/// proxy alive; once the subscriber is dropped the proxy forwards nothing
/// and the next [`sweep`](Self::sweep) withdraws it.
///
/// Dropping the registry withdraws every proxy it still has registered.
///
/// # Example
///
/// ```rust,ignore
/// let registry = WeakRegistry::from_config(
///     &WeakRegistryConfig::default().with_sweep_interval(Duration::from_secs(1)),
/// )?;
/// registry.register(&panel, &bus)?;
/// ```
pub struct WeakRegistry {
    reaper: Option<Reaper>,
    inner: Arc<RegistryInner>,
}

impl WeakRegistry {
    /// Create a registry that looks proxies up in [`ProxyCatalog::global`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(CatalogSource::Global)
    }

    /// Create a registry that looks proxies up in `catalog`.
    #[must_use]
    pub fn with_catalog(catalog: Arc<ProxyCatalog>) -> Self {
        Self::with_source(CatalogSource::Custom(catalog))
    }

    fn with_source(catalog: CatalogSource) -> Self {
        Self {
            reaper: None,
            inner: Arc::new(RegistryInner {
                table: DashMap::new(),
                catalog,
            }),
        }
    }

    /// Create a registry from `config`, starting the reaper if it sets a
    /// sweep interval.
    ///
    /// # Errors
    ///
    /// Returns [`WeakBusError::Reaper`] if the reaper thread cannot start.
    pub fn from_config(config: &WeakRegistryConfig) -> WeakResult<Self> {
        let mut registry = Self::new();
        registry.start_reaper(config)?;
        Ok(registry)
    }

    /// Start (or restart) the reaper described by `config`.
    ///
    /// Stops any running reaper first. Does nothing more when `config` sets
    /// no sweep interval.
    ///
    /// # Errors
    ///
    /// Returns [`WeakBusError::Reaper`] if the reaper thread cannot start.
    pub fn start_reaper(&mut self, config: &WeakRegistryConfig) -> WeakResult<()> {
        self.reaper = None;
        if let Some(interval) = config.sweep_interval {
            self.reaper = Some(Reaper::spawn(
                Arc::downgrade(&self.inner),
                interval,
                &config.reaper_thread_name,
            )?);
        }
        Ok(())
    }

    /// Whether a reaper thread is running.
    #[must_use]
    pub fn has_reaper(&self) -> bool {
        self.reaper.is_some()
    }

    /// Register `subscriber` with `bus` without keeping it alive.
    ///
    /// Builds a proxy from the catalog entry for `T` and registers the
    /// proxy with the bus. Registering the same subscriber with the same bus
    /// again withdraws the previous proxy before the fresh one is added, so
    /// no event reaches the subscriber twice. An event posted in between
    /// reaches neither.
    ///
    /// If the bus rejects the fresh proxy, the subscriber ends up not
    /// registered with `bus`.
    ///
    /// # Errors
    ///
    /// - [`WeakBusError::NoProxyAvailable`] if no proxy was generated for
    ///   `T`.
    /// - [`WeakBusError::EngineRejection`] if the bus refuses the proxy.
    pub fn register<T>(&self, subscriber: &Arc<T>, bus: &EventBus) -> WeakResult<()>
    where
        T: Any + Send + Sync,
    {
        let no_proxy = || WeakBusError::NoProxyAvailable {
            subscriber: type_name::<T>().to_string(),
        };
        let entry = self.inner.catalog().get_for::<T>().ok_or_else(no_proxy)?;
        let proxy = entry.instantiate(subscriber).ok_or_else(no_proxy)?;

        let registration = Registration {
            watch: ReachabilityWatch::new(subscriber),
            proxy: Arc::clone(&proxy),
            bus: bus.downgrade(),
            proxy_name: entry.proxy_name(),
        };

        let key = (InstanceId::of(subscriber), bus.id());
        // The slot stays locked until the table agrees with the bus.
        match self.inner.table.entry(key) {
            Entry::Occupied(mut occupied) => {
                debug!(
                    subscriber = type_name::<T>(),
                    bus = %bus.id(),
                    "Replacing existing weak registration"
                );
                // Withdrawn before the new proxy goes in; no post sees both.
                if let Err(e) = bus.deregister_instance(&occupied.get().proxy) {
                    warn!(
                        proxy = occupied.get().proxy_name,
                        bus = %bus.id(),
                        error = %e,
                        "Displaced weak proxy was already withdrawn"
                    );
                }
                if let Err(e) = bus.register_instance(proxy) {
                    occupied.remove();
                    return Err(e.into());
                }
                occupied.insert(registration);
            },
            Entry::Vacant(vacant) => {
                bus.register_instance(proxy)?;
                vacant.insert(registration);
            },
        }

        debug!(
            subscriber = type_name::<T>(),
            proxy = entry.proxy_name(),
            bus = %bus.id(),
            "Weak subscriber registered"
        );
        Ok(())
    }

    /// Withdraw `subscriber` from `bus`.
    ///
    /// A subscriber that is not registered with `bus` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`WeakBusError::EngineRejection`] if the bus no longer knows
    /// the proxy.
    pub fn unregister<T>(&self, subscriber: &Arc<T>, bus: &EventBus) -> WeakResult<()>
    where
        T: ?Sized,
    {
        let key = (InstanceId::of(subscriber), bus.id());
        let Some((_, registration)) = self.inner.table.remove(&key) else {
            trace!(bus = %bus.id(), "Unregister of unknown weak subscriber ignored");
            return Ok(());
        };

        bus.deregister_instance(&registration.proxy)?;
        debug!(
            proxy = registration.proxy_name,
            bus = %bus.id(),
            "Weak subscriber unregistered"
        );
        Ok(())
    }

    /// Withdraw every registration whose subscriber (or bus) is gone.
    ///
    /// Returns the number of registrations removed. Safe to call
    /// concurrently with itself and with `register` / `unregister`; each
    /// stale registration is withdrawn exactly once.
    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    /// Whether `subscriber` is registered with `bus` through this registry.
    #[must_use]
    pub fn is_registered<T: ?Sized>(&self, subscriber: &Arc<T>, bus: &EventBus) -> bool {
        self.inner
            .table
            .contains_key(&(InstanceId::of(subscriber), bus.id()))
    }

    /// Number of registrations, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.table.len()
    }

    /// Whether the registry holds no registration.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.table.is_empty()
    }

    /// The catalog proxies are looked up in.
    #[must_use]
    pub fn catalog(&self) -> &ProxyCatalog {
        self.inner.catalog()
    }
}

impl Default for WeakRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WeakRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRegistry")
            .field("registrations", &self.len())
            .field("reaper", &self.has_reaper())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProxyEntry;
    use crate::proxy::WeakProxy;
    use std::sync::{Mutex, Weak};
    use std::thread;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Meter {
        seen: Mutex<Vec<u32>>,
    }

    impl Meter {
        fn record(&self, reading: &u32) {
            self.seen.lock().unwrap().push(*reading);
        }

        fn seen(&self) -> Vec<u32> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[allow(non_camel_case_types)]
    struct WeakProxy_Meter {
        target: Weak<Meter>,
    }

    #[crate::subscriber(crate = crate)]
    impl WeakProxy_Meter {
        #[subscribe]
        fn record(&self, reading: &u32) {
            crate::forward(&self.target, Self::NAME, "record", |target| {
                target.record(reading);
            });
        }
    }

    impl WeakProxy for WeakProxy_Meter {
        type Target = Meter;
        const NAME: &'static str = "WeakProxy_Meter";

        fn wrap(target: &Arc<Meter>) -> Self {
            Self {
                target: Arc::downgrade(target),
            }
        }
    }

    fn registry() -> WeakRegistry {
        let catalog = ProxyCatalog::new();
        catalog.install(ProxyEntry::of::<WeakProxy_Meter>());
        WeakRegistry::with_catalog(Arc::new(catalog))
    }

    #[test]
    fn test_register_delivers_without_owning() {
        let registry = registry();
        let bus = EventBus::new();
        let meter = Arc::new(Meter::default());

        registry.register(&meter, &bus).unwrap();
        assert!(registry.is_registered(&meter, &bus));
        assert_eq!(Arc::strong_count(&meter), 1);

        assert_eq!(bus.post(7_u32), 1);
        assert_eq!(meter.seen(), vec![7]);
    }

    #[test]
    fn test_register_without_proxy() {
        let registry = registry();
        let bus = EventBus::new();
        let plain = Arc::new(String::from("no proxy"));

        let err = registry.register(&plain, &bus).unwrap_err();
        match err {
            WeakBusError::NoProxyAvailable { subscriber } => {
                assert_eq!(subscriber, type_name::<String>());
            },
            other => panic!("unexpected error: {other}"),
        }
        assert!(registry.is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let registry = registry();
        let bus = EventBus::new();
        let meter = Arc::new(Meter::default());

        registry.register(&meter, &bus).unwrap();
        registry.unregister(&meter, &bus).unwrap();
        assert!(!registry.is_registered(&meter, &bus));
        assert_eq!(bus.subscriber_count(), 0);

        bus.post(1_u32);
        assert!(meter.seen().is_empty());

        // Unknown pair is a no-op.
        registry.unregister(&meter, &bus).unwrap();
    }

    #[test]
    fn test_reregister_replaces_proxy() {
        let registry = registry();
        let bus = EventBus::new();
        let meter = Arc::new(Meter::default());

        registry.register(&meter, &bus).unwrap();
        registry.register(&meter, &bus).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(bus.subscriber_count(), 1);

        bus.post(3_u32);
        assert_eq!(meter.seen(), vec![3]);
    }

    #[test]
    fn test_reregister_never_exposes_two_proxies() {
        let registry = Arc::new(registry());
        let bus = EventBus::new();
        let meter = Arc::new(Meter::default());
        registry.register(&meter, &bus).unwrap();

        let reregister = {
            let registry = Arc::clone(&registry);
            let bus = bus.clone();
            let meter = Arc::clone(&meter);
            thread::spawn(move || {
                for _ in 0..200 {
                    registry.register(&meter, &bus).unwrap();
                }
            })
        };
        let mut max_delivered = 0_usize;
        while !reregister.is_finished() {
            max_delivered = max_delivered.max(bus.post(1_u32));
        }
        reregister.join().unwrap();

        assert!(max_delivered <= 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_one_subscriber_two_buses() {
        let registry = registry();
        let first = EventBus::new();
        let second = EventBus::new();
        let meter = Arc::new(Meter::default());

        registry.register(&meter, &first).unwrap();
        registry.register(&meter, &second).unwrap();
        assert_eq!(registry.len(), 2);

        registry.unregister(&meter, &first).unwrap();
        first.post(1_u32);
        second.post(2_u32);
        assert_eq!(meter.seen(), vec![2]);
    }

    #[test]
    fn test_sweep_withdraws_dropped_subscriber() {
        let registry = registry();
        let bus = EventBus::new();
        let meter = Arc::new(Meter::default());
        registry.register(&meter, &bus).unwrap();

        drop(meter);
        // Still registered until swept; the proxy drops the event.
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.post(5_u32), 1);

        assert_eq!(registry.sweep(), 1);
        assert!(registry.is_empty());
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(registry.sweep(), 0);
    }

    #[test]
    fn test_sweep_keeps_live_subscribers() {
        let registry = registry();
        let bus = EventBus::new();
        let kept = Arc::new(Meter::default());
        let dropped = Arc::new(Meter::default());
        registry.register(&kept, &bus).unwrap();
        registry.register(&dropped, &bus).unwrap();

        drop(dropped);
        assert_eq!(registry.sweep(), 1);
        assert!(registry.is_registered(&kept, &bus));

        bus.post(9_u32);
        assert_eq!(kept.seen(), vec![9]);
    }

    #[test]
    fn test_sweep_forgets_dropped_bus() {
        let registry = registry();
        let meter = Arc::new(Meter::default());
        let bus = EventBus::new();
        registry.register(&meter, &bus).unwrap();

        drop(bus);
        assert_eq!(registry.sweep(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dropping_registry_withdraws_proxies() {
        let bus = EventBus::new();
        let meter = Arc::new(Meter::default());
        {
            let registry = registry();
            registry.register(&meter, &bus).unwrap();
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_concurrent_sweeps_remove_once() {
        let registry = Arc::new(registry());
        let bus = EventBus::new();
        for _ in 0..32 {
            let meter = Arc::new(Meter::default());
            registry.register(&meter, &bus).unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.sweep())
            })
            .collect();
        let total: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .fold(0, usize::saturating_add);

        assert_eq!(total, 32);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_reaper_sweeps_in_background() {
        let mut registry = registry();
        registry
            .start_reaper(
                &WeakRegistryConfig::default()
                    .with_sweep_interval(Duration::from_millis(10))
                    .with_reaper_thread_name("test-reaper"),
            )
            .unwrap();
        assert!(registry.has_reaper());

        let bus = EventBus::new();
        let meter = Arc::new(Meter::default());
        registry.register(&meter, &bus).unwrap();
        drop(meter);

        let deadline = Instant::now()
            .checked_add(Duration::from_secs(5))
            .unwrap();
        while !registry.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(registry.is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_no_reaper_without_interval() {
        let registry = WeakRegistry::from_config(&WeakRegistryConfig::default()).unwrap();
        assert!(!registry.has_reaper());
    }
}
