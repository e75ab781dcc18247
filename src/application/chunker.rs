//! Frame chunker: forwards captured frames to the encoder and requests a flush
//! every timeslice

use tracing::{debug, trace};

use super::encoder_channel::ChannelSender;
use crate::domain::audio::AudioFrame;
use crate::domain::recording::{Timeslice, TimesliceAccumulator};

/// Outcome of handling one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No encoder attached; the frame was dropped
    Dropped,
    /// Forwarded to the encoder
    Forwarded,
    /// Forwarded, and the timeslice elapsed so a flush was requested
    Flushed,
}

/// Per-session chunker. Audio is not buffered here: every frame is moved to
/// the encoder as soon as it arrives.
#[derive(Debug)]
pub struct FrameChunker {
    sender: Option<ChannelSender>,
    accumulator: TimesliceAccumulator,
}

impl FrameChunker {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sender: None,
            accumulator: TimesliceAccumulator::new(sample_rate, Timeslice::UNBOUNDED),
        }
    }

    /// Route frames to a (new) encoder channel
    pub fn attach(&mut self, sender: ChannelSender) {
        debug!(generation = sender.generation(), "chunker attached");
        self.sender = Some(sender);
    }

    pub fn detach(&mut self) {
        self.sender = None;
    }

    pub fn is_attached(&self) -> bool {
        self.sender.is_some()
    }

    /// Set the flush interval and clear elapsed time
    pub fn configure(&mut self, timeslice: Timeslice) {
        self.accumulator.configure(timeslice);
    }

    /// Clear elapsed time so pre-pause audio does not count toward the next
    /// flush
    pub fn reset(&mut self) {
        self.accumulator.reset();
    }

    /// Seconds of audio forwarded since the last flush request
    pub fn elapsed(&self) -> f64 {
        self.accumulator.elapsed()
    }

    pub fn on_frame(&mut self, frame: AudioFrame) -> FrameOutcome {
        let Some(sender) = &self.sender else {
            return FrameOutcome::Dropped;
        };

        let frame_count = frame.frame_count();
        if !sender.push_input_data(frame) {
            return FrameOutcome::Dropped;
        }

        if self.accumulator.advance(frame_count) {
            trace!(generation = sender.generation(), "timeslice elapsed, requesting data");
            sender.get_encoded_data();
            return FrameOutcome::Flushed;
        }
        FrameOutcome::Forwarded
    }
}
