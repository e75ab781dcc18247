//! Recording time values: durations and timeslices

mod duration;
mod timeslice;

pub use duration::{Duration, DEFAULT_DURATION_SECS};
pub use timeslice::{Timeslice, TimesliceAccumulator};
