// ── Transport collaborator seam ──
//
// The tunnel itself lives outside this crate. The core only needs
// cumulative byte counters and a connect/disconnect pair.

use std::sync::Arc;

use async_trait::async_trait;

/// Error produced by a transport backend. Passed through to callers as-is.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Cumulative byte counters of a live transport.
///
/// Both counters are expected to be non-decreasing; a backend that resets
/// them (reconnect, restart) is tolerated by the sampler.
pub trait TrafficSource: Send + Sync {
    /// Total bytes read (uplink) since the transport was created.
    fn bytes_read(&self) -> u64;

    /// Total bytes written (downlink) since the transport was created.
    fn bytes_written(&self) -> u64;
}

/// A tunnel client bound to exactly one connection item.
#[async_trait]
pub trait TransportClient: TrafficSource {
    /// Bring the tunnel up for `link`.
    async fn connect(&self, link: &str) -> Result<(), TransportError>;

    /// Tear the tunnel down. Must succeed when never connected.
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Builds a fresh [`TransportClient`] every time an item is (re)built.
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn TransportClient>, TransportError>;
}

impl<F> TransportFactory for F
where
    F: Fn() -> Result<Arc<dyn TransportClient>, TransportError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn TransportClient>, TransportError> {
        self()
    }
}
