//! Bounded FIFO buffer of recorded traffic samples.

use std::collections::VecDeque;

use serde::Serialize;

/// One sampling tick: megabits uploaded and downloaded during the interval.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TrafficSample {
    pub read_mbit: f64,
    pub written_mbit: f64,
}

/// Fixed-capacity window of samples, oldest first.
///
/// Read and write values are stored as pairs, so the two series derived
/// from a window always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    samples: VecDeque<TrafficSample>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one when the window is full.
    /// Returns the evicted sample, if any.
    pub fn push(&mut self, sample: TrafficSample) -> Option<TrafficSample> {
        if self.capacity == 0 {
            return None;
        }
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<TrafficSample> {
        self.samples.back().copied()
    }

    /// Uplink series in megabits, oldest first.
    pub fn read_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.read_mbit).collect()
    }

    /// Downlink series in megabits, oldest first.
    pub fn written_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.written_mbit).collect()
    }
}
