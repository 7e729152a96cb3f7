// ── Traffic sampler ──
//
// Turns cumulative byte counters into a bounded per-interval series.
// A single background task owns all writes; readers take snapshots
// through a `watch` channel, so a read never sees a half-applied tick.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::window::{SampleWindow, TrafficSample};
use crate::config::SamplerConfig;
use crate::error::CoreError;
use crate::transport::TrafficSource;

/// Bytes in one megabit.
pub const BYTES_PER_MEGABIT: f64 = 125_000.0;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn to_megabits(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MEGABIT
}

// ── TrafficHistory ───────────────────────────────────────────────

/// Everything a sampler has recorded, as one consistent value.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficHistory {
    window: SampleWindow,
    total_read: u64,
    total_written: u64,
    last_read: u64,
    last_written: u64,
    ticks: u64,
}

impl TrafficHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: SampleWindow::new(capacity),
            total_read: 0,
            total_written: 0,
            last_read: 0,
            last_written: 0,
            ticks: 0,
        }
    }

    /// Take the counters' current values as the baseline for the next delta.
    ///
    /// Totals never move backwards: a baseline below what was already
    /// observed only shifts the delta origin.
    pub(crate) fn prime(&mut self, read: u64, written: u64) {
        self.last_read = read;
        self.last_written = written;
        self.total_read = self.total_read.max(read);
        self.total_written = self.total_written.max(written);
    }

    /// Apply one tick from cumulative counter values and return the sample.
    ///
    /// A counter that went backwards contributes zero and becomes the new
    /// baseline.
    pub(crate) fn record(&mut self, read: u64, written: u64) -> TrafficSample {
        if read < self.last_read || written < self.last_written {
            debug!(
                read,
                written,
                last_read = self.last_read,
                last_written = self.last_written,
                "traffic counter reset detected"
            );
        }

        let read_delta = read.saturating_sub(self.last_read);
        let written_delta = written.saturating_sub(self.last_written);
        self.last_read = read;
        self.last_written = written;
        self.total_read = self.total_read.saturating_add(read_delta);
        self.total_written = self.total_written.saturating_add(written_delta);

        self.push(TrafficSample {
            read_mbit: to_megabits(read_delta),
            written_mbit: to_megabits(written_delta),
        })
    }

    /// Apply one tick with no counter source attached.
    pub(crate) fn record_idle(&mut self) -> TrafficSample {
        self.push(TrafficSample::default())
    }

    fn push(&mut self, sample: TrafficSample) -> TrafficSample {
        self.window.push(sample);
        self.ticks += 1;
        sample
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn read_series(&self) -> Vec<f64> {
        self.window.read_series()
    }

    pub fn written_series(&self) -> Vec<f64> {
        self.window.written_series()
    }

    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of ticks applied since creation (including evicted ones).
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

// ── Sampler ──────────────────────────────────────────────────────

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodically samples a [`TrafficSource`] into a [`TrafficHistory`].
///
/// Created idle. [`start()`](Self::start) spawns the sampling task on the
/// current tokio runtime; [`stop()`](Self::stop) cancels it and waits for
/// the task to exit.
pub struct Sampler {
    source: Option<Arc<dyn TrafficSource>>,
    config: SamplerConfig,
    history: Arc<watch::Sender<TrafficHistory>>,
    running: Mutex<Option<RunningLoop>>,
}

impl Sampler {
    /// Create an idle sampler. `None` samples zeros on every tick.
    pub fn new(source: Option<Arc<dyn TrafficSource>>, config: SamplerConfig) -> Self {
        let (history, _) = watch::channel(TrafficHistory::new(config.capacity));
        Self {
            source,
            config,
            history: Arc::new(history),
            running: Mutex::new(None),
        }
    }

    /// Start the background sampling task.
    ///
    /// Fails with [`CoreError::SamplerRunning`] if already started and
    /// [`CoreError::NoRuntime`] outside a tokio runtime.
    pub fn start(&self) -> Result<(), CoreError> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return Err(CoreError::SamplerRunning);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| CoreError::NoRuntime)?;

        if let Some(source) = &self.source {
            let (read, written) = (source.bytes_read(), source.bytes_written());
            self.history.send_modify(|h| h.prime(read, written));
        }

        let interval = self.config.interval.max(MIN_INTERVAL);
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(sample_task(
            self.source.clone(),
            Arc::clone(&self.history),
            ticker,
            cancel.clone(),
        ));
        *running = Some(RunningLoop { cancel, handle });

        debug!(?interval, "traffic sampler started");
        Ok(())
    }

    /// Stop sampling and wait for the task to exit.
    ///
    /// No sample is recorded once this returns. Calling it on an idle
    /// sampler is a no-op.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(RunningLoop { cancel, handle }) = running else {
            return;
        };

        cancel.cancel();
        if let Err(e) = handle.await {
            warn!(error = %e, "traffic sampler task ended abnormally");
        }
        debug!("traffic sampler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Time between two samples.
    pub fn record_interval(&self) -> Duration {
        self.config.interval
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Consistent copy of everything recorded so far.
    pub fn snapshot(&self) -> TrafficHistory {
        self.history.borrow().clone()
    }

    /// Watch every tick as it is recorded.
    pub fn subscribe(&self) -> watch::Receiver<TrafficHistory> {
        self.history.subscribe()
    }

    /// Uplink megabits per interval, oldest first.
    pub fn read_series(&self) -> Vec<f64> {
        self.history.borrow().read_series()
    }

    /// Downlink megabits per interval, oldest first.
    pub fn written_series(&self) -> Vec<f64> {
        self.history.borrow().written_series()
    }

    /// Total uplink bytes observed.
    pub fn total_read(&self) -> u64 {
        self.history.borrow().total_read()
    }

    /// Total downlink bytes observed.
    pub fn total_written(&self) -> u64 {
        self.history.borrow().total_written()
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if let Some(running) = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            running.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("config", &self.config)
            .field("has_source", &self.source.is_some())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

// ── Background task ──────────────────────────────────────────────

async fn sample_task(
    source: Option<Arc<dyn TrafficSource>>,
    history: Arc<watch::Sender<TrafficHistory>>,
    mut ticker: tokio::time::Interval,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let counters = source
                    .as_ref()
                    .map(|s| (s.bytes_read(), s.bytes_written()));
                history.send_modify(|h| {
                    let sample = match counters {
                        Some((read, written)) => h.record(read, written),
                        None => h.record_idle(),
                    };
                    trace!(read = sample.read_mbit, written = sample.written_mbit, "traffic sample");
                });
            }
        }
    }
}
