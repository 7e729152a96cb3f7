#![allow(clippy::unwrap_used)]

// End-to-end flows through the registry, the switcher and the per-item
// samplers, driven by an in-memory transport on a paused clock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

use linktray_core::{
    ConnectionRegistry, ConnectionSwitcher, RegistryConfig, SamplerConfig, TrafficSource,
    TransportClient, TransportError,
};

const TICK: Duration = Duration::from_secs(1);
const BERLIN: &str = "vless://0b1c@berlin.example.com:443?security=tls#Berlin";
const OSLO: &str = "trojan://pw@oslo.example.com:443#Oslo";

#[derive(Default)]
struct Tunnel {
    read: AtomicU64,
    written: AtomicU64,
    connected: AtomicBool,
}

impl Tunnel {
    fn add(&self, read: u64, written: u64) {
        self.read.fetch_add(read, Ordering::SeqCst);
        self.written.fetch_add(written, Ordering::SeqCst);
    }
}

impl TrafficSource for Tunnel {
    fn bytes_read(&self) -> u64 {
        self.read.load(Ordering::SeqCst)
    }

    fn bytes_written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportClient for Tunnel {
    async fn connect(&self, _link: &str) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Registry plus every tunnel it has built, in build order.
fn setup(capacity: usize) -> (ConnectionRegistry, Arc<Mutex<Vec<Arc<Tunnel>>>>) {
    let tunnels = Arc::new(Mutex::new(Vec::new()));
    let built = Arc::clone(&tunnels);
    let factory = move || -> Result<Arc<dyn TransportClient>, TransportError> {
        let tunnel = Arc::new(Tunnel::default());
        built.lock().unwrap().push(Arc::clone(&tunnel));
        Ok(tunnel)
    };
    let config = RegistryConfig {
        sampler: SamplerConfig {
            interval: TICK,
            capacity,
        },
        ..RegistryConfig::default()
    };
    (ConnectionRegistry::new(factory, config), tunnels)
}

fn tunnel(tunnels: &Mutex<Vec<Arc<Tunnel>>>, index: usize) -> Arc<Tunnel> {
    Arc::clone(&tunnels.lock().unwrap()[index])
}

async fn tick() {
    tokio::time::advance(TICK).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn switching_connections_keeps_one_active_and_samples_each() {
    let (mut registry, tunnels) = setup(120);
    let berlin = registry.add_item("Berlin", BERLIN).unwrap();
    let oslo = registry.add_item("Oslo", OSLO).unwrap();

    ConnectionSwitcher::toggle(&mut registry, berlin).await.unwrap();
    assert!(tunnel(&tunnels, 0).connected.load(Ordering::SeqCst));

    tunnel(&tunnels, 0).add(125_000, 250_000);
    tick().await;
    tunnel(&tunnels, 0).add(125_000, 0);
    tick().await;

    let item = registry.get(berlin).unwrap();
    assert_eq!(item.read_series(), vec![1.0, 1.0]);
    assert_eq!(item.written_series(), vec![2.0, 0.0]);
    assert_eq!(item.total_read(), 250_000);
    assert_eq!(registry.get(oslo).unwrap().read_series(), vec![0.0, 0.0]);

    ConnectionSwitcher::toggle(&mut registry, oslo).await.unwrap();
    assert!(!tunnel(&tunnels, 0).connected.load(Ordering::SeqCst));
    assert!(tunnel(&tunnels, 1).connected.load(Ordering::SeqCst));
    assert_eq!(
        registry.active().map(|(_, item)| item.label().to_owned()),
        Some("Oslo".to_owned())
    );

    ConnectionSwitcher::deactivate_all(&mut registry).await.unwrap();
    assert!(!registry.has_active());
    assert!(!tunnel(&tunnels, 1).connected.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn window_stays_bounded_and_series_stay_paired() {
    let (mut registry, tunnels) = setup(4);
    let id = registry.add_item("Berlin", BERLIN).unwrap();

    for i in 1..=10_u64 {
        tunnel(&tunnels, 0).add(i * 125_000, 125_000);
        tick().await;
        let history = registry.get(id).unwrap().traffic();
        assert_eq!(history.read_series().len(), history.written_series().len());
    }

    let item = registry.get(id).unwrap();
    assert_eq!(item.read_series(), vec![7.0, 8.0, 9.0, 10.0]);
    assert_eq!(item.written_series(), vec![1.0; 4]);
}

#[tokio::test(start_paused = true)]
async fn removed_item_stops_sampling() {
    let (mut registry, tunnels) = setup(120);
    let id = registry.add_item("Berlin", BERLIN).unwrap();
    tick().await;

    let traffic = registry.get(id).unwrap().subscribe_traffic();
    let ticks_before = traffic.borrow().ticks();
    assert_eq!(ticks_before, 1);

    assert!(registry.remove_item(id).await);
    tunnel(&tunnels, 0).add(125_000, 125_000);
    for _ in 0..5 {
        tick().await;
    }

    assert_eq!(traffic.borrow().ticks(), ticks_before);
}

#[tokio::test(start_paused = true)]
async fn update_rebuilds_transport_and_history() {
    let (mut registry, tunnels) = setup(120);
    let id = registry.add_item("Berlin", BERLIN).unwrap();
    tunnel(&tunnels, 0).add(250_000, 0);
    tick().await;
    assert_eq!(registry.get(id).unwrap().read_series(), vec![2.0]);

    registry.update_item(id, "Oslo", OSLO).await.unwrap();
    assert_eq!(tunnels.lock().unwrap().len(), 2);

    let item = registry.get(id).unwrap();
    assert_eq!(item.label(), "Oslo");
    assert_eq!(item.config().protocol(), Some("trojan"));
    assert!(item.read_series().is_empty());

    tunnel(&tunnels, 1).add(125_000, 0);
    tick().await;
    assert_eq!(registry.get(id).unwrap().read_series(), vec![1.0]);
}

#[tokio::test(start_paused = true)]
async fn notifications_arrive_in_order() {
    let (mut registry, _tunnels) = setup(120);
    let events = Arc::new(Mutex::new(Vec::<String>::new()));

    let log = Arc::clone(&events);
    registry.on_add(move |_, item| log.lock().unwrap().push(format!("add:{}", item.label())));
    let log = Arc::clone(&events);
    registry.on_delete(move |_, item| log.lock().unwrap().push(format!("delete:{}", item.label())));
    let log = Arc::clone(&events);
    registry.on_swap(move |_, _| log.lock().unwrap().push("swap".to_owned()));
    let log = Arc::clone(&events);
    registry.on_change(move |items| {
        let labels: Vec<String> = items.iter().map(|(_, i)| i.label().to_owned()).collect();
        log.lock().unwrap().push(format!("change:[{}]", labels.join(",")));
    });

    let berlin = registry.add_item("Berlin", BERLIN).unwrap();
    let oslo = registry.add_item("Oslo", OSLO).unwrap();
    assert_ok!(registry.swap_items(berlin, oslo));
    assert!(registry.remove_item(berlin).await);
    assert_err!(registry.swap_items(berlin, oslo));

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "add:Berlin",
            "change:[Berlin]",
            "add:Oslo",
            "change:[Berlin,Oslo]",
            "swap",
            "change:[Oslo,Berlin]",
            "delete:Berlin",
            "change:[Oslo]",
        ]
    );
}
