//! Encoding infrastructure module
//!
//! PCM WAV is always built. Opus in Ogg and WebM containers requires the
//! `opus` cargo feature, which links libopus.

mod factory;
mod wave;

#[cfg(feature = "opus")]
mod ogg_opus;
#[cfg(feature = "opus")]
mod opus_stream;
#[cfg(feature = "opus")]
mod webm;

pub use factory::DefaultEncoderFactory;
pub use wave::{patch_wave_header, to_pcm16, WaveEncoder, WAVE_HEADER_LEN};

#[cfg(feature = "opus")]
pub use ogg_opus::OggOpusEncoder;
#[cfg(feature = "opus")]
pub use opus_stream::{OpusPacket, OpusPacketizer, OPUS_SAMPLE_RATE};
#[cfg(feature = "opus")]
pub use webm::WebmOpusEncoder;
