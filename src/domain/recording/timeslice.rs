//! Timeslice value object and the elapsed-time accumulator driving periodic flushes

use std::fmt;

use crate::domain::error::TimesliceError;

/// How often intermediate chunks are requested from the encoder.
///
/// `Timeslice::UNBOUNDED` (and a zero timeslice) only flushes when recording
/// stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timeslice {
    millis: Option<u64>,
}

impl Timeslice {
    /// Never flush periodically
    pub const UNBOUNDED: Self = Self { millis: None };

    /// Validate a caller-provided timeslice in milliseconds
    pub fn from_millis(millis: i64) -> Result<Self, TimesliceError> {
        if millis < 0 {
            return Err(TimesliceError { millis });
        }
        Ok(Self {
            millis: Some(millis.unsigned_abs()),
        })
    }

    /// Timeslice in milliseconds, `None` when unbounded
    pub const fn as_millis(&self) -> Option<u64> {
        self.millis
    }

    /// Timeslice in seconds, `None` when unbounded
    pub fn as_secs_f64(&self) -> Option<f64> {
        self.millis.map(|ms| ms as f64 / 1000.0)
    }

    /// Whether this timeslice triggers any flush before stop
    pub const fn is_periodic(&self) -> bool {
        matches!(self.millis, Some(ms) if ms > 0)
    }
}

impl fmt::Display for Timeslice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.millis {
            Some(ms) if ms > 0 => write!(f, "{}ms", ms),
            _ => write!(f, "unbounded"),
        }
    }
}

/// Tracks audio time pushed since the last flush request.
///
/// Time is counted in sample frames at the session's fixed sample rate so that
/// many short buffers add up exactly to the threshold.
#[derive(Debug, Clone)]
pub struct TimesliceAccumulator {
    sample_rate: u32,
    threshold_frames: Option<u64>,
    elapsed_frames: u64,
}

impl TimesliceAccumulator {
    pub fn new(sample_rate: u32, timeslice: Timeslice) -> Self {
        let mut accumulator = Self {
            sample_rate,
            threshold_frames: None,
            elapsed_frames: 0,
        };
        accumulator.configure(timeslice);
        accumulator
    }

    /// Set a new threshold and clear elapsed time
    pub fn configure(&mut self, timeslice: Timeslice) {
        self.threshold_frames = match timeslice.as_millis() {
            Some(ms) if ms > 0 => {
                let frames = (u128::from(ms) * u128::from(self.sample_rate) + 500) / 1000;
                Some(u64::try_from(frames).unwrap_or(u64::MAX).max(1))
            }
            _ => None,
        };
        self.elapsed_frames = 0;
    }

    /// Add `frame_count` frames. Returns true (and resets) once the threshold
    /// is reached.
    pub fn advance(&mut self, frame_count: usize) -> bool {
        self.elapsed_frames = self
            .elapsed_frames
            .saturating_add(u64::try_from(frame_count).unwrap_or(u64::MAX));

        match self.threshold_frames {
            Some(threshold) if self.elapsed_frames >= threshold => {
                self.elapsed_frames = 0;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed_frames = 0;
    }

    /// Seconds accumulated since the last flush
    pub fn elapsed(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.elapsed_frames as f64 / f64::from(self.sample_rate)
    }

    /// Threshold in seconds, `None` when only the final flush applies
    pub fn threshold(&self) -> Option<f64> {
        if self.sample_rate == 0 {
            return None;
        }
        self.threshold_frames
            .map(|frames| frames as f64 / f64::from(self.sample_rate))
    }
}
