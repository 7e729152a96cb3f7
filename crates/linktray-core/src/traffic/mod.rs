// ── Live traffic sampling ──
//
// Cumulative counters in, bounded megabit series out.

mod sampler;
mod window;

pub use sampler::{BYTES_PER_MEGABIT, Sampler, TrafficHistory};
pub use window::{SampleWindow, TrafficSample};
