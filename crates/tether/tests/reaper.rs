//! Background sweeping by the reaper thread.

use std::sync::Arc;
use std::time::Duration;

use tether::{WeakRegistry, WeakRegistryConfig};
use tether_test::{EventLog, init_test_tracing, test_bus, test_registry_with_reaper, wait_until};

struct Listener {
    log: EventLog,
}

#[tether::weak_subscriber]
impl Listener {
    #[weak_subscribe]
    fn on_tick(&self, tick: &u64) {
        self.log.record(format!("tick:{tick}"));
    }
}

#[test]
fn test_reaper_withdraws_dropped_subscriber() {
    init_test_tracing();
    let bus = test_bus();
    let registry = test_registry_with_reaper(Duration::from_millis(10));

    let log = EventLog::new();
    let listener = Arc::new(Listener { log: log.clone() });
    registry.register(&listener, &bus).unwrap();
    bus.post(1_u64);

    drop(listener);
    assert!(wait_until(Duration::from_secs(5), || registry.is_empty()));
    assert_eq!(bus.subscriber_count(), 0);
    assert_eq!(log.entries(), ["tick:1"]);
}

#[test]
fn test_reaper_keeps_live_subscriber() {
    let bus = test_bus();
    let registry = test_registry_with_reaper(Duration::from_millis(5));

    let log = EventLog::new();
    let listener = Arc::new(Listener { log: log.clone() });
    registry.register(&listener, &bus).unwrap();

    std::thread::sleep(Duration::from_millis(50));
    assert!(registry.is_registered(&listener, &bus));
    bus.post(2_u64);
    assert_eq!(log.entries(), ["tick:2"]);
}

#[test]
fn test_reaper_from_toml_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tether.toml");
    std::fs::write(
        &path,
        "sweep_interval_ms = 10\nreaper_thread_name = \"toml-reaper\"\n",
    )
    .unwrap();

    let config = WeakRegistryConfig::from_file(&path).unwrap();
    let registry = WeakRegistry::from_config(&config).unwrap();
    assert!(registry.has_reaper());

    let bus = test_bus();
    let listener = Arc::new(Listener {
        log: EventLog::new(),
    });
    registry.register(&listener, &bus).unwrap();
    drop(listener);
    assert!(wait_until(Duration::from_secs(5), || bus.subscriber_count() == 0));
}

#[test]
fn test_dropping_registry_stops_reaper() {
    let bus = test_bus();
    let listener = Arc::new(Listener {
        log: EventLog::new(),
    });
    {
        let registry = test_registry_with_reaper(Duration::from_millis(5));
        registry.register(&listener, &bus).unwrap();
    }
    // Withdrawn on drop even though the listener is alive.
    assert_eq!(bus.subscriber_count(), 0);
}
