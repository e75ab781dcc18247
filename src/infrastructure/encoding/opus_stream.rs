//! Opus packet stream shared by the Ogg and WebM containers
//!
//! Input is resampled to 48 kHz with rubato when the track runs at another
//! rate, then cut into 20 ms frames and encoded with libopus.

use rubato::{FftFixedIn, Resampler};

use crate::application::ports::{EncoderError, EncoderParams};
use crate::domain::audio::AudioFrame;

/// Opus always runs at 48 kHz here
pub const OPUS_SAMPLE_RATE: u32 = 48000;

/// Samples per channel in one 20 ms packet
pub const OPUS_FRAME_SIZE: usize = 960;

/// Encoder lookahead signalled to decoders (6.5 ms at 48 kHz)
pub const PRE_SKIP: u16 = 312;

/// Resampler input chunk size
const RESAMPLER_CHUNK: usize = 1024;

const MAX_PACKET_SIZE: usize = 4000;

/// One encoded Opus packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpusPacket {
    pub data: Vec<u8>,
    /// Index of the packet within the stream, from zero
    pub index: u64,
}

impl OpusPacket {
    /// Samples per channel decoded once this packet has been played
    pub fn end_sample(&self) -> u64 {
        (self.index + 1) * OPUS_FRAME_SIZE as u64
    }

    /// Presentation time of the packet start in milliseconds
    pub fn timestamp_ms(&self) -> u64 {
        self.index * 20
    }
}

/// Planar float input in, Opus packets out
pub struct OpusPacketizer {
    encoder: opus::Encoder,
    channels: usize,
    input_rate: u32,
    resampler: Option<FftFixedIn<f32>>,
    resampler_input: Vec<Vec<f32>>,
    /// Interleaved 48 kHz samples awaiting a full packet
    pending: Vec<f32>,
    input_frames: u64,
    next_index: u64,
}

impl OpusPacketizer {
    pub fn new(params: EncoderParams) -> Result<Self, EncoderError> {
        if params.sample_rate == 0 || params.channel_count == 0 {
            return Err(EncoderError::InvalidParams(
                "sample rate and channel count must be positive".into(),
            ));
        }

        // Mono and stereo only; extra channels are dropped
        let channels = usize::from(params.channel_count.min(2));
        let layout = if channels == 1 {
            opus::Channels::Mono
        } else {
            opus::Channels::Stereo
        };

        let mut encoder = opus::Encoder::new(OPUS_SAMPLE_RATE, layout, opus::Application::Audio)
            .map_err(|e| EncoderError::InvalidParams(format!("opus init failed: {}", e)))?;
        if let Some(bits) = params.bits_per_second {
            let bits = i32::try_from(bits).unwrap_or(i32::MAX);
            encoder
                .set_bitrate(opus::Bitrate::Bits(bits))
                .map_err(|e| EncoderError::InvalidParams(format!("bitrate rejected: {}", e)))?;
        }

        let resampler = if params.sample_rate == OPUS_SAMPLE_RATE {
            None
        } else {
            Some(
                FftFixedIn::<f32>::new(
                    params.sample_rate as usize,
                    OPUS_SAMPLE_RATE as usize,
                    RESAMPLER_CHUNK,
                    2,
                    channels,
                )
                .map_err(|e| EncoderError::InvalidParams(format!("resampler init failed: {}", e)))?,
            )
        };

        Ok(Self {
            encoder,
            channels,
            input_rate: params.sample_rate,
            resampler,
            resampler_input: vec![Vec::new(); channels],
            pending: Vec::new(),
            input_frames: 0,
            next_index: 0,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Samples per channel of real (unpadded) audio at 48 kHz
    pub fn output_samples(&self) -> u64 {
        self.input_frames * u64::from(OPUS_SAMPLE_RATE) / u64::from(self.input_rate)
    }

    pub fn push(&mut self, frame: AudioFrame) -> Result<Vec<OpusPacket>, EncoderError> {
        if frame.channel_count() == 0 {
            return Err(EncoderError::InvalidInput("frame has no channels".into()));
        }
        self.input_frames += frame.frame_count() as u64;

        let mut buffers = frame.into_channel_buffers();
        // Duplicate mono into a stereo layout if the track under-reports
        while buffers.len() < self.channels {
            let copy = buffers[0].clone();
            buffers.push(copy);
        }
        buffers.truncate(self.channels);

        if self.resampler.is_none() {
            self.queue_planar(&buffers);
        } else {
            for (queue, buffer) in self.resampler_input.iter_mut().zip(buffers) {
                queue.extend(buffer);
            }
            self.drain_resampler(false)?;
        }
        self.encode_ready(false)
    }

    /// Flush the resampler and pad the final packet. Always yields at least
    /// one packet so containers can close the stream.
    pub fn finish(&mut self) -> Result<Vec<OpusPacket>, EncoderError> {
        if self.resampler.is_some() {
            self.drain_resampler(true)?;
        }
        self.encode_ready(true)
    }

    fn queue_planar(&mut self, buffers: &[Vec<f32>]) {
        let frames = buffers.iter().map(Vec::len).min().unwrap_or(0);
        self.pending.reserve(frames * self.channels);
        for i in 0..frames {
            for buffer in buffers {
                self.pending.push(buffer[i]);
            }
        }
    }

    fn drain_resampler(&mut self, flush: bool) -> Result<(), EncoderError> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(());
        };

        let mut output = Vec::new();
        loop {
            let needed = resampler.input_frames_next();
            let available = self.resampler_input.first().map_or(0, Vec::len);
            if available < needed {
                if !flush || available == 0 {
                    break;
                }
                for queue in &mut self.resampler_input {
                    queue.resize(needed, 0.0);
                }
            }

            let chunk: Vec<Vec<f32>> = self
                .resampler_input
                .iter_mut()
                .map(|queue| queue.drain(..needed).collect())
                .collect();
            let resampled = resampler
                .process(&chunk, None)
                .map_err(|e| EncoderError::EncodeFailed(format!("resampling failed: {}", e)))?;
            output.push(resampled);
        }

        for resampled in output {
            self.queue_planar(&resampled);
        }
        Ok(())
    }

    fn encode_ready(&mut self, pad: bool) -> Result<Vec<OpusPacket>, EncoderError> {
        let packet_len = OPUS_FRAME_SIZE * self.channels;
        if pad {
            let remainder = self.pending.len() % packet_len;
            if remainder != 0 || self.pending.is_empty() {
                let padded = self.pending.len() + packet_len - remainder;
                self.pending.resize(padded, 0.0);
            }
        }

        let mut packets = Vec::new();
        while self.pending.len() >= packet_len {
            let samples: Vec<f32> = self.pending.drain(..packet_len).collect();
            let data = self
                .encoder
                .encode_vec_float(&samples, MAX_PACKET_SIZE)
                .map_err(|e| EncoderError::EncodeFailed(format!("opus encoding failed: {}", e)))?;
            packets.push(OpusPacket {
                data,
                index: self.next_index,
            });
            self.next_index += 1;
        }
        Ok(packets)
    }
}

/// Opus identification header, shared by the Ogg stream and the WebM
/// `CodecPrivate` element
pub fn opus_head(channels: usize, input_rate: u32) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1); // version
    head.push(channels as u8);
    head.extend_from_slice(&PRE_SKIP.to_le_bytes());
    head.extend_from_slice(&input_rate.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes()); // output gain
    head.push(0); // mapping family
    head
}

/// Opus comment header with no user comments
pub fn opus_tags(vendor: &str) -> Vec<u8> {
    let mut tags = Vec::with_capacity(16 + vendor.len());
    tags.extend_from_slice(b"OpusTags");
    tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    tags.extend_from_slice(vendor.as_bytes());
    tags.extend_from_slice(&0u32.to_le_bytes());
    tags
}
