// linktray-core: connection registry and live traffic sampling.
//
// The registry owns the configured connections, the switcher keeps at most
// one of them active, and every connection carries a sampler that turns
// its transport's byte counters into a bounded megabit history.

pub mod config;
pub mod error;
pub mod item;
pub mod link;
pub mod registry;
pub mod switch;
pub mod traffic;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{RegistryConfig, SamplerConfig};
pub use error::CoreError;
pub use item::ConnectionItem;
pub use link::{LinkConfig, LinkError, LinkParser, Protocol, ShareLinkParser};
pub use registry::{ConnectionRegistry, ItemId, ItemList, Listed};
pub use switch::{ConnectionSwitcher, Toggled};
pub use traffic::{Sampler, SampleWindow, TrafficHistory, TrafficSample};
pub use transport::{TrafficSource, TransportClient, TransportError, TransportFactory};
