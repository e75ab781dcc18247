//! Encoder port interfaces and the message protocol spoken across the
//! encoder boundary

use std::sync::Arc;
use thiserror::Error;

use crate::domain::audio::AudioFrame;
use crate::domain::mime::EncoderKind;

/// Errors raised inside an encoder context
#[derive(Debug, Clone, Error)]
pub enum EncoderError {
    #[error("Encoder {0} is not available in this build")]
    Unavailable(EncoderKind),

    #[error("Invalid encoder parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding failed: {0}")]
    EncodeFailed(String),

    #[error("Encoder received {0} before init")]
    NotInitialized(&'static str),

    #[error("Failed to spawn encoder worker: {0}")]
    SpawnFailed(String),
}

/// Parameters of the `init` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderParams {
    pub sample_rate: u32,
    pub channel_count: u16,
    /// Opaque target bitrate hint
    pub bits_per_second: Option<u32>,
}

/// Commands sent to an encoder worker, processed in send order
#[derive(Debug)]
pub enum EncoderCommand {
    Init(EncoderParams),
    /// Audio to encode; the frame is moved, not shared
    PushInputData(AudioFrame),
    /// Flush whatever has been encoded so far
    GetEncodedData,
    /// Finish the stream; the worker answers with the final data and exits
    Done,
}

impl EncoderCommand {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::PushInputData(_) => "pushInputData",
            Self::GetEncodedData => "getEncodedData",
            Self::Done => "done",
        }
    }
}

/// Responses emitted by an encoder worker, delivered in production order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderResponse {
    /// Setup finished; the worker accepts `init`
    ReadyToInit,
    /// Zero or more completed buffers
    EncodedData(Vec<Vec<u8>>),
    /// Final buffers; the worker has shut down
    LastEncodedData(Vec<Vec<u8>>),
    /// Internal failure; the worker has shut down
    Fault(String),
}

/// Port for a codec running inside an encoder context.
///
/// Encoders buffer partial state between `push` calls and only hand out bytes
/// from `flush` and `finish`.
pub trait AudioEncoder: Send {
    fn init(&mut self, params: EncoderParams) -> Result<(), EncoderError>;

    fn push(&mut self, frame: AudioFrame) -> Result<(), EncoderError>;

    /// Bytes completed since the previous flush
    fn flush(&mut self) -> Result<Vec<Vec<u8>>, EncoderError>;

    /// Remaining bytes, closing the stream
    fn finish(&mut self) -> Result<Vec<Vec<u8>>, EncoderError>;
}

/// Port creating encoders. `create` runs inside the new encoder context and
/// may take as long as setup requires.
pub trait EncoderFactory: Send + Sync {
    fn create(&self, kind: EncoderKind) -> Result<Box<dyn AudioEncoder>, EncoderError>;
}

impl<T: EncoderFactory + ?Sized> EncoderFactory for Arc<T> {
    fn create(&self, kind: EncoderKind) -> Result<Box<dyn AudioEncoder>, EncoderError> {
        (**self).create(kind)
    }
}
