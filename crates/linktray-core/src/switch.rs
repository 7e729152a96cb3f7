//! Click-to-toggle activation with a single active connection.

use tracing::{info, warn};

use crate::error::CoreError;
use crate::registry::{ConnectionRegistry, ItemId};

/// What [`ConnectionSwitcher::toggle`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    /// The item was active and has been disconnected.
    Disconnected,
    /// The item is now connected and active. `replaced` is the item that
    /// was active before, if any.
    Connected { replaced: Option<ItemId> },
}

/// Orchestrates connect/disconnect so at most one item is ever active.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionSwitcher;

impl ConnectionSwitcher {
    /// Toggle `id`: disconnect it if it is active, otherwise disconnect
    /// whichever item is active and connect `id` in its place.
    ///
    /// A failed or timed-out disconnect of the previous item aborts before
    /// `id` is touched. A failed connect leaves nothing active.
    pub async fn toggle(registry: &mut ConnectionRegistry, id: ItemId) -> Result<Toggled, CoreError> {
        if !registry.contains(id) {
            return Err(CoreError::ItemNotFound { id });
        }

        if registry.is_active(id) {
            registry.disconnect(id).await?;
            registry.set_active(id, false)?;
            return Ok(Toggled::Disconnected);
        }

        let replaced = registry.active().map(|(previous, _)| previous);
        if let Some(previous) = replaced {
            registry.disconnect(previous).await?;
            registry.set_active(previous, false)?;
        }

        // The previous item is already inactive, so a failed connect
        // leaves nothing active.
        if let Err(e) = registry.connect(id).await {
            warn!(item = %id, error = %e, "connect failed");
            return Err(e);
        }
        registry.set_active(id, true)?;
        info!(item = %id, "switched active connection");
        Ok(Toggled::Connected { replaced })
    }

    /// Disconnect and deactivate every active item. Used on shutdown.
    ///
    /// Every active item is attempted; the first error is returned.
    pub async fn deactivate_all(registry: &mut ConnectionRegistry) -> Result<(), CoreError> {
        let active: Vec<ItemId> = registry
            .all()
            .filter(|(_, item)| item.is_active())
            .map(|(id, _)| id)
            .collect();

        let mut first_err = None;
        for id in active {
            if let Err(e) = registry.disconnect(id).await {
                warn!(item = %id, error = %e, "disconnect failed");
                first_err.get_or_insert(e);
            }
            registry.set_active(id, false)?;
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::RegistryConfig;
    use crate::transport::{TrafficSource, TransportClient, TransportError};

    /// Records connect/disconnect calls by link; refuses links containing "down".
    struct Recording {
        log: Arc<Mutex<Vec<String>>>,
        link: Mutex<String>,
        fail_disconnect: Arc<AtomicBool>,
        hang_disconnect: Arc<AtomicBool>,
    }

    impl TrafficSource for Recording {
        fn bytes_read(&self) -> u64 {
            0
        }

        fn bytes_written(&self) -> u64 {
            0
        }
    }

    #[async_trait]
    impl TransportClient for Recording {
        async fn connect(&self, link: &str) -> Result<(), TransportError> {
            if link.contains("down") {
                return Err("host unreachable".into());
            }
            *self.link.lock().unwrap() = link.to_owned();
            self.log.lock().unwrap().push(format!("connect {link}"));
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            if self.hang_disconnect.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail_disconnect.load(Ordering::SeqCst) {
                return Err("tunnel stuck".into());
            }
            let link = self.link.lock().unwrap().clone();
            self.log.lock().unwrap().push(format!("disconnect {link}"));
            Ok(())
        }
    }

    struct Fixture {
        registry: ConnectionRegistry,
        log: Arc<Mutex<Vec<String>>>,
        fail_disconnect: Arc<AtomicBool>,
        hang_disconnect: Arc<AtomicBool>,
    }

    fn fixture() -> Fixture {
        let log = Arc::new(Mutex::new(Vec::new()));
        let fail_disconnect = Arc::new(AtomicBool::new(false));
        let hang_disconnect = Arc::new(AtomicBool::new(false));
        let (l, f, h) = (
            Arc::clone(&log),
            Arc::clone(&fail_disconnect),
            Arc::clone(&hang_disconnect),
        );
        let factory = move || -> Result<Arc<dyn TransportClient>, TransportError> {
            Ok(Arc::new(Recording {
                log: Arc::clone(&l),
                link: Mutex::new(String::new()),
                fail_disconnect: Arc::clone(&f),
                hang_disconnect: Arc::clone(&h),
            }))
        };
        Fixture {
            registry: ConnectionRegistry::new(factory, RegistryConfig::default()),
            log,
            fail_disconnect,
            hang_disconnect,
        }
    }

    const A: &str = "vless://id@a.example.com:443";
    const B: &str = "vless://id@b.example.com:443";
    const DOWN: &str = "vless://id@down.example.com:443";

    #[tokio::test(start_paused = true)]
    async fn toggle_connects_then_disconnects() {
        let mut fx = fixture();
        let a = fx.registry.add_item("A", A).unwrap();

        let outcome = ConnectionSwitcher::toggle(&mut fx.registry, a).await.unwrap();
        assert_eq!(outcome, Toggled::Connected { replaced: None });
        assert!(fx.registry.is_active(a));

        let outcome = ConnectionSwitcher::toggle(&mut fx.registry, a).await.unwrap();
        assert_eq!(outcome, Toggled::Disconnected);
        assert!(!fx.registry.has_active());
        assert_eq!(
            *fx.log.lock().unwrap(),
            vec![format!("connect {A}"), format!("disconnect {A}")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn switching_disconnects_previous_first() {
        let mut fx = fixture();
        let a = fx.registry.add_item("A", A).unwrap();
        let b = fx.registry.add_item("B", B).unwrap();

        ConnectionSwitcher::toggle(&mut fx.registry, a).await.unwrap();
        let outcome = ConnectionSwitcher::toggle(&mut fx.registry, b).await.unwrap();

        assert_eq!(outcome, Toggled::Connected { replaced: Some(a) });
        assert!(fx.registry.is_active(b));
        assert!(!fx.registry.is_active(a));
        assert_eq!(
            *fx.log.lock().unwrap(),
            vec![
                format!("connect {A}"),
                format!("disconnect {A}"),
                format!("connect {B}"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_leaves_nothing_active() {
        let mut fx = fixture();
        let a = fx.registry.add_item("A", A).unwrap();
        let down = fx.registry.add_item("Down", DOWN).unwrap();

        ConnectionSwitcher::toggle(&mut fx.registry, a).await.unwrap();
        let err = ConnectionSwitcher::toggle(&mut fx.registry, down)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "host unreachable");
        assert!(!fx.registry.has_active());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_disconnect_of_previous_aborts_switch() {
        let mut fx = fixture();
        let a = fx.registry.add_item("A", A).unwrap();
        let b = fx.registry.add_item("B", B).unwrap();
        ConnectionSwitcher::toggle(&mut fx.registry, a).await.unwrap();

        fx.fail_disconnect.store(true, Ordering::SeqCst);
        let err = ConnectionSwitcher::toggle(&mut fx.registry, b)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "tunnel stuck");
        assert!(fx.registry.is_active(a));
        assert!(!fx.registry.is_active(b));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_disconnect_times_out_and_keeps_previous_active() {
        let mut fx = fixture();
        let a = fx.registry.add_item("A", A).unwrap();
        let b = fx.registry.add_item("B", B).unwrap();
        ConnectionSwitcher::toggle(&mut fx.registry, a).await.unwrap();

        fx.hang_disconnect.store(true, Ordering::SeqCst);
        let err = ConnectionSwitcher::toggle(&mut fx.registry, b)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DisconnectTimeout { timeout_secs: 10 }));
        assert!(fx.registry.is_active(a));
        assert!(!fx.registry.is_active(b));

        let err = ConnectionSwitcher::toggle(&mut fx.registry, a)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DisconnectTimeout { .. }));
        assert!(fx.registry.is_active(a));
        assert_eq!(*fx.log.lock().unwrap(), vec![format!("connect {A}")]);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivate_all_reports_timeout_but_clears_flags() {
        let mut fx = fixture();
        let a = fx.registry.add_item("A", A).unwrap();
        ConnectionSwitcher::toggle(&mut fx.registry, a).await.unwrap();

        fx.hang_disconnect.store(true, Ordering::SeqCst);
        let err = ConnectionSwitcher::deactivate_all(&mut fx.registry)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DisconnectTimeout { .. }));
        assert!(!fx.registry.has_active());
    }

    #[tokio::test(start_paused = true)]
    async fn deactivate_all_clears_flags() {
        let mut fx = fixture();
        let a = fx.registry.add_item("A", A).unwrap();
        ConnectionSwitcher::toggle(&mut fx.registry, a).await.unwrap();

        ConnectionSwitcher::deactivate_all(&mut fx.registry).await.unwrap();
        assert!(!fx.registry.has_active());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_item_is_not_found() {
        let mut fx = fixture();
        let a = fx.registry.add_item("A", A).unwrap();
        fx.registry.remove_item(a).await;

        let err = ConnectionSwitcher::toggle(&mut fx.registry, a).await.unwrap_err();
        assert!(matches!(err, CoreError::ItemNotFound { .. }));
    }
}
