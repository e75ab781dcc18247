//! Manually driven capture source

use std::sync::Mutex;

use crate::application::lock;
use crate::application::ports::{CaptureError, CaptureSource, FrameSink};
use crate::domain::audio::{AudioFrame, TrackSettings};

/// Capture source whose frames are pushed by the caller.
///
/// Frames pushed while disconnected are dropped, like a live device whose
/// processing node is detached.
pub struct ManualCapture {
    track: Option<TrackSettings>,
    sink: Mutex<Option<FrameSink>>,
}

impl ManualCapture {
    pub fn new(channel_count: u16, sample_rate: u32) -> Self {
        Self::with_track(TrackSettings::new(channel_count, sample_rate))
    }

    pub fn with_track(track: TrackSettings) -> Self {
        Self {
            track: Some(track),
            sink: Mutex::new(None),
        }
    }

    /// A stream with no audio track
    pub fn without_track() -> Self {
        Self {
            track: None,
            sink: Mutex::new(None),
        }
    }

    /// Deliver one frame. Returns false if nothing is connected.
    pub fn push_frame(&self, frame: AudioFrame) -> bool {
        // Release the slot before calling out so the sink may reconnect
        let sink = lock(&self.sink).clone();
        match sink {
            Some(sink) => {
                sink(frame);
                true
            }
            None => false,
        }
    }

    /// Deliver `count` silent frames of `frame_count` samples each.
    /// Returns how many were delivered.
    pub fn push_silence(&self, count: usize, frame_count: usize) -> usize {
        let Some(track) = self.track else {
            return 0;
        };
        (0..count)
            .filter(|_| {
                self.push_frame(AudioFrame::silence(
                    track.channel_count_or_default(),
                    frame_count,
                    track.sample_rate,
                ))
            })
            .count()
    }
}

impl CaptureSource for ManualCapture {
    fn track(&self) -> Option<TrackSettings> {
        self.track
    }

    fn connect(&self, sink: FrameSink) -> Result<(), CaptureError> {
        if self.track.is_none() {
            return Err(CaptureError::Closed);
        }
        *lock(&self.sink) = Some(sink);
        Ok(())
    }

    fn disconnect(&self) {
        lock(&self.sink).take();
    }

    fn is_connected(&self) -> bool {
        lock(&self.sink).is_some()
    }
}
