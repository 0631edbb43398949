// Training targets
// Dense two-channel indicator signals and the interval annotations derived
// from them

pub mod intervals;
pub mod render;

pub use intervals::{build_intervals, Interval, IntervalClass};
pub use render::{DenseTarget, BEAT_CHANNEL, DOWNBEAT_CHANNEL};
