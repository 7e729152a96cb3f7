// ── Runtime registry configuration ──
//
// These types describe *how* connections are sampled and torn down.
// They never touch disk: linktray-config (or any embedder) builds a
// `RegistryConfig` and hands it to the registry.

use std::time::Duration;

/// Default sampling interval: one sample per second.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Default window capacity: two minutes of samples at 1 Hz.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 120;

/// Default upper bound for a transport disconnect during teardown.
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Traffic sampler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Time between two samples.
    pub interval: Duration,
    /// Number of samples retained per series.
    pub capacity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SAMPLE_INTERVAL,
            capacity: DEFAULT_SAMPLE_CAPACITY,
        }
    }
}

/// Configuration for a [`ConnectionRegistry`](crate::ConnectionRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Sampler settings applied to every item the registry builds.
    pub sampler: SamplerConfig,
    /// How long to wait for a transport to disconnect when an active
    /// item is removed.
    pub disconnect_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            disconnect_timeout: DEFAULT_DISCONNECT_TIMEOUT,
        }
    }
}
