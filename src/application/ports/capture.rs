//! Capture port interfaces

use std::sync::Arc;
use thiserror::Error;

use crate::domain::audio::{AudioFrame, TrackSettings};

/// Capture errors
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("No audio device available")]
    NoAudioDevice,

    #[error("Failed to open audio stream: {0}")]
    StreamFailed(String),

    #[error("Capture source is closed")]
    Closed,
}

/// Callback receiving every captured frame while the source is connected.
/// Ownership of the frame moves to the callee.
pub type FrameSink = Arc<dyn Fn(AudioFrame) + Send + Sync>;

/// Port for a live audio source delivering fixed-size buffers at a fixed rate.
///
/// Connecting installs the sink and starts delivery; disconnecting stops it.
/// Only the recorder changes the connection.
pub trait CaptureSource: Send + Sync {
    /// Settings of the first audio track, `None` if the stream has no audio
    fn track(&self) -> Option<TrackSettings>;

    /// Start delivering frames to `sink`, replacing any previous sink
    fn connect(&self, sink: FrameSink) -> Result<(), CaptureError>;

    /// Stop delivering frames. Idempotent.
    fn disconnect(&self);

    fn is_connected(&self) -> bool;
}

impl<T: CaptureSource + ?Sized> CaptureSource for Arc<T> {
    fn track(&self) -> Option<TrackSettings> {
        (**self).track()
    }

    fn connect(&self, sink: FrameSink) -> Result<(), CaptureError> {
        (**self).connect(sink)
    }

    fn disconnect(&self) {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
