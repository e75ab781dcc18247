//! Encoder factory for the built-in codecs

use tracing::debug;

#[cfg(feature = "opus")]
use super::{OggOpusEncoder, WebmOpusEncoder};
use super::WaveEncoder;
use crate::application::ports::{AudioEncoder, EncoderError, EncoderFactory};
use crate::domain::mime::EncoderKind;

/// Builds the encoder for each [`EncoderKind`]. Opus kinds need the `opus`
/// cargo feature; without it they fail as a setup fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEncoderFactory;

impl DefaultEncoderFactory {
    pub fn new() -> Self {
        Self
    }

    /// Whether encoders of `kind` can be created in this build
    pub fn is_available(kind: EncoderKind) -> bool {
        match kind {
            EncoderKind::Wave => true,
            EncoderKind::OggOpus | EncoderKind::WebmOpus => cfg!(feature = "opus"),
        }
    }
}

impl EncoderFactory for DefaultEncoderFactory {
    fn create(&self, kind: EncoderKind) -> Result<Box<dyn AudioEncoder>, EncoderError> {
        debug!(encoder = %kind, "creating encoder");
        match kind {
            EncoderKind::Wave => Ok(Box::new(WaveEncoder::new())),
            #[cfg(feature = "opus")]
            EncoderKind::OggOpus => Ok(Box::new(OggOpusEncoder::new())),
            #[cfg(feature = "opus")]
            EncoderKind::WebmOpus => Ok(Box::new(WebmOpusEncoder::new())),
            #[cfg(not(feature = "opus"))]
            EncoderKind::OggOpus | EncoderKind::WebmOpus => Err(EncoderError::Unavailable(kind)),
        }
    }
}
