// ── Connection registry ──
//
// Owns the ordered list of connections and mediates every mutation so
// that observers (tray menu, list view, persistence) can be notified.
// Every event fires its specific handler first, then the generic change
// handler, then bumps the change counter seen by `subscribe()`.

mod list;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use list::{ItemList, Listed};

use crate::config::RegistryConfig;
use crate::error::CoreError;
use crate::item::{ConnectionItem, ItemBuilder};
use crate::link::{LinkParser, ShareLinkParser};
use crate::transport::TransportFactory;

/// Stable identity of a list element. Never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub(crate) u64);

impl ItemId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type ItemHandler = Box<dyn FnMut(ItemId, &ConnectionItem) + Send>;
type SwapHandler = Box<dyn FnMut(ItemId, ItemId) + Send>;
type ChangeHandler = Box<dyn FnMut(&ItemList<ConnectionItem>) + Send>;

struct Handlers {
    on_add: ItemHandler,
    on_delete: ItemHandler,
    on_swap: SwapHandler,
    on_change: ChangeHandler,
}

impl Default for Handlers {
    fn default() -> Self {
        Self {
            on_add: Box::new(|_, _| {}),
            on_delete: Box::new(|_, _| {}),
            on_swap: Box::new(|_, _| {}),
            on_change: Box::new(|_| {}),
        }
    }
}

/// The authoritative, ordered set of configured connections.
///
/// Mutating methods take `&mut self`; wrap the registry in a lock if it
/// must be shared. Handlers run synchronously inside the mutating call and
/// receive read-only views, so they may enumerate the registry but cannot
/// change it.
pub struct ConnectionRegistry {
    items: ItemList<ConnectionItem>,
    builder: ItemBuilder,
    disconnect_timeout: Duration,
    handlers: Handlers,
    changes: watch::Sender<u64>,
}

impl ConnectionRegistry {
    /// Create an empty registry that parses links with [`ShareLinkParser`]
    /// and builds transports with `factory`.
    pub fn new(factory: impl TransportFactory + 'static, config: RegistryConfig) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            items: ItemList::new(),
            builder: ItemBuilder {
                parser: Arc::new(ShareLinkParser),
                factory: Arc::new(factory),
                sampler: config.sampler,
            },
            disconnect_timeout: config.disconnect_timeout,
            handlers: Handlers::default(),
            changes,
        }
    }

    /// Replace the link parser used for subsequent adds and updates.
    pub fn with_parser(mut self, parser: impl LinkParser + 'static) -> Self {
        self.builder.parser = Arc::new(parser);
        self
    }

    // ── Handlers ─────────────────────────────────────────────────────

    pub fn on_add(&mut self, handler: impl FnMut(ItemId, &ConnectionItem) + Send + 'static) {
        self.handlers.on_add = Box::new(handler);
    }

    /// Called before the item is unlinked, while it is still fully readable.
    pub fn on_delete(&mut self, handler: impl FnMut(ItemId, &ConnectionItem) + Send + 'static) {
        self.handlers.on_delete = Box::new(handler);
    }

    pub fn on_swap(&mut self, handler: impl FnMut(ItemId, ItemId) + Send + 'static) {
        self.handlers.on_swap = Box::new(handler);
    }

    pub fn on_change(
        &mut self,
        handler: impl FnMut(&ItemList<ConnectionItem>) + Send + 'static,
    ) {
        self.handlers.on_change = Box::new(handler);
    }

    /// Receiver whose value increments on every change notification.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn notify_change(&mut self) {
        (self.handlers.on_change)(&self.items);
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Parse `link`, build the item and append it.
    ///
    /// Must be called inside a tokio runtime: the item's sampler starts
    /// immediately.
    pub fn add_item(&mut self, label: &str, link: &str) -> Result<ItemId, CoreError> {
        let item = self.builder.new_item(label, link)?;
        let id = self.items.push(item);
        info!(item = %id, label, "connection added");

        if let Some(item) = self.items.get(id) {
            (self.handlers.on_add)(id, item);
        }
        self.notify_change();
        Ok(id)
    }

    /// Remove `id`, stopping its sampler and disconnecting it if active.
    ///
    /// Returns `false` (and notifies nobody) if `id` is not a member.
    /// Teardown failures are logged, not returned.
    pub async fn remove_item(&mut self, id: ItemId) -> bool {
        let Some(item) = self.items.get(id) else {
            return false;
        };
        (self.handlers.on_delete)(id, item);

        let Some(item) = self.items.remove(id) else {
            return false;
        };
        info!(item = %id, label = item.label(), "connection removed");

        if item.is_active() {
            if let Err(e) = self.bounded_disconnect(&item).await {
                warn!(label = item.label(), error = %e, "disconnect failed during removal");
            }
        }
        item.shutdown().await;

        self.notify_change();
        true
    }

    /// Exchange the positions of two members.
    pub fn swap_items(&mut self, a: ItemId, b: ItemId) -> Result<(), CoreError> {
        self.items.swap(a, b)?;
        debug!(a = %a, b = %b, "connections swapped");
        (self.handlers.on_swap)(a, b);
        self.notify_change();
        Ok(())
    }

    /// Change the label and link of an inactive item, rebuilding its
    /// transport and sampler.
    pub async fn update_item(&mut self, id: ItemId, label: &str, link: &str) -> Result<(), CoreError> {
        let item = self
            .items
            .get_mut(id)
            .ok_or(CoreError::ItemNotFound { id })?;
        if item.is_active() {
            return Err(CoreError::ItemActive {
                label: item.label().to_owned(),
            });
        }
        item.update(&self.builder, label, link).await?;
        info!(item = %id, label, "connection updated");
        self.notify_change();
        Ok(())
    }

    /// Flip the active flag of `id`. Does not connect or disconnect.
    pub fn set_active(&mut self, id: ItemId, active: bool) -> Result<(), CoreError> {
        let item = self
            .items
            .get_mut(id)
            .ok_or(CoreError::ItemNotFound { id })?;
        Listed::set_active(item, active);
        debug!(item = %id, active, "active flag changed");
        self.notify_change();
        Ok(())
    }

    // ── Transport ────────────────────────────────────────────────────

    pub async fn connect(&self, id: ItemId) -> Result<(), CoreError> {
        self.require(id)?.connect().await
    }

    /// Disconnect `id`, giving up once the configured disconnect timeout
    /// elapses. The active flag is left alone either way.
    pub async fn disconnect(&self, id: ItemId) -> Result<(), CoreError> {
        self.bounded_disconnect(self.require(id)?).await
    }

    async fn bounded_disconnect(&self, item: &ConnectionItem) -> Result<(), CoreError> {
        tokio::time::timeout(self.disconnect_timeout, item.disconnect())
            .await
            .map_err(|_| CoreError::DisconnectTimeout {
                timeout_secs: self.disconnect_timeout.as_secs(),
            })?
    }

    // ── Queries ──────────────────────────────────────────────────────

    fn require(&self, id: ItemId) -> Result<&ConnectionItem, CoreError> {
        self.items.get(id).ok_or(CoreError::ItemNotFound { id })
    }

    /// Live items in their current order.
    pub fn all(&self) -> impl Iterator<Item = (ItemId, &ConnectionItem)> {
        self.items.iter()
    }

    pub fn items(&self) -> &ItemList<ConnectionItem> {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&ConnectionItem> {
        self.items.get(id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_active(&self) -> bool {
        self.items.has_active()
    }

    pub fn active(&self) -> Option<(ItemId, &ConnectionItem)> {
        self.items.active()
    }

    pub fn is_active(&self, id: ItemId) -> bool {
        self.items.is_active(id)
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("items", &self.items)
            .field("disconnect_timeout", &self.disconnect_timeout)
            .finish_non_exhaustive()
    }
}
