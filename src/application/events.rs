//! Events delivered to recorder observers

use std::fmt;

use crate::domain::audio::EncodedChunk;

/// Category of an asynchronous error event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The encoder context reported an internal failure
    EncoderFault,
    /// The capture source refused to connect
    CaptureFault,
}

impl ErrorKind {
    /// DOM-style error name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EncoderFault => "UnknownError",
            Self::CaptureFault => "NotReadableError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Observer events, in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// Init reached a live encoder and capture is connected.
    ///
    /// Usually follows `start()`. If the encoder became ready while paused,
    /// `resume()` sends init instead and the order is `Pause`, `Start`,
    /// `Resume`.
    Start,
    DataAvailable(EncodedChunk),
    Pause,
    Resume,
    /// Follows the final `DataAvailable` of a recording
    Stop,
    Error { kind: ErrorKind, message: String },
}

impl RecorderEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::DataAvailable(_) => "dataavailable",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Error { .. } => "error",
        }
    }
}
