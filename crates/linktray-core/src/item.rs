// ── Connection item ──
//
// One configured connection: its label and link, the fields parsed from
// the link, and the transport client + sampler built for it. Policy
// (who may be active, when edits are allowed) lives in the registry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::SamplerConfig;
use crate::error::CoreError;
use crate::link::{LinkConfig, LinkParser};
use crate::registry::Listed;
use crate::traffic::{Sampler, TrafficHistory};
use crate::transport::{TrafficSource, TransportClient, TransportFactory};

/// Builds the derived parts of a [`ConnectionItem`] from a link.
pub(crate) struct ItemBuilder {
    pub(crate) parser: Arc<dyn LinkParser>,
    pub(crate) factory: Arc<dyn TransportFactory>,
    pub(crate) sampler: SamplerConfig,
}

/// Everything that is rebuilt when the link changes.
struct Built {
    config: LinkConfig,
    client: Arc<dyn TransportClient>,
    sampler: Sampler,
}

impl ItemBuilder {
    /// Parse `link`, create a transport client and start a sampler on it.
    /// Nothing is kept if any step fails.
    fn build(&self, link: &str) -> Result<Built, CoreError> {
        let config = self
            .parser
            .parse(link)
            .map_err(|e| CoreError::invalid_link(link, e))?;

        let client = self
            .factory
            .create()
            .map_err(|e| CoreError::TransportInit {
                reason: e.to_string(),
            })?;

        let source: Arc<dyn TrafficSource> = client.clone();
        let sampler = Sampler::new(Some(source), self.sampler);
        sampler.start()?;

        Ok(Built {
            config,
            client,
            sampler,
        })
    }

    pub(crate) fn new_item(&self, label: &str, link: &str) -> Result<ConnectionItem, CoreError> {
        let built = self.build(link)?;
        debug!(label, protocol = ?built.config.protocol(), "connection built");
        Ok(ConnectionItem {
            label: label.to_owned(),
            link: link.to_owned(),
            config: built.config,
            active: false,
            client: built.client,
            sampler: built.sampler,
        })
    }
}

/// A configured connection and its live transport state.
pub struct ConnectionItem {
    label: String,
    link: String,
    config: LinkConfig,
    active: bool,
    client: Arc<dyn TransportClient>,
    sampler: Sampler,
}

impl ConnectionItem {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    /// Fields parsed from the current link.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    // ── Transport ────────────────────────────────────────────────────

    /// Bring the transport up for this item's link. Does not touch the
    /// active flag.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.client
            .connect(&self.link)
            .await
            .map_err(CoreError::Transport)?;
        info!(label = %self.label, "connected");
        Ok(())
    }

    /// Tear the transport down. Safe to call when never connected.
    pub async fn disconnect(&self) -> Result<(), CoreError> {
        self.client
            .disconnect()
            .await
            .map_err(CoreError::Transport)?;
        info!(label = %self.label, "disconnected");
        Ok(())
    }

    // ── Traffic ──────────────────────────────────────────────────────

    /// Uplink megabits per tick, oldest first.
    pub fn read_series(&self) -> Vec<f64> {
        self.sampler.read_series()
    }

    /// Downlink megabits per tick, oldest first.
    pub fn written_series(&self) -> Vec<f64> {
        self.sampler.written_series()
    }

    pub fn total_read(&self) -> u64 {
        self.sampler.total_read()
    }

    pub fn total_written(&self) -> u64 {
        self.sampler.total_written()
    }

    pub fn record_interval(&self) -> Duration {
        self.sampler.record_interval()
    }

    /// Consistent copy of both series and totals.
    pub fn traffic(&self) -> TrafficHistory {
        self.sampler.snapshot()
    }

    pub fn subscribe_traffic(&self) -> watch::Receiver<TrafficHistory> {
        self.sampler.subscribe()
    }

    // ── Registry-only mutation ───────────────────────────────────────

    /// Re-parse and rebuild in place. On error the item is left as it was.
    pub(crate) async fn update(
        &mut self,
        builder: &ItemBuilder,
        label: &str,
        link: &str,
    ) -> Result<(), CoreError> {
        let built = builder.build(link)?;

        let old = std::mem::replace(&mut self.sampler, built.sampler);
        old.stop().await;

        self.client = built.client;
        self.config = built.config;
        self.link = link.to_owned();
        self.label = label.to_owned();
        debug!(label, "connection rebuilt");
        Ok(())
    }

    /// Stop sampling. Called once the item has left the registry.
    pub(crate) async fn shutdown(&self) {
        self.sampler.stop().await;
    }
}

impl Listed for ConnectionItem {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl std::fmt::Debug for ConnectionItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionItem")
            .field("label", &self.label)
            .field("protocol", &self.config.protocol())
            .field("active", &self.active)
            .field("sampler", &self.sampler)
            .finish_non_exhaustive()
    }
}
