//! PCM WAV encoder
//!
//! Emits signed 16-bit little-endian interleaved samples. The stream size is
//! unknown while recording, so the header carries the streaming sentinel
//! `0xFFFFFFFF`; [`patch_wave_header`] rewrites it once the file is complete.

use crate::application::ports::{AudioEncoder, EncoderError, EncoderParams};
use crate::domain::audio::AudioFrame;

/// Size of the canonical RIFF/WAVE header
pub const WAVE_HEADER_LEN: usize = 44;

/// Chunk size used while the total length is unknown
const STREAMING_SIZE: u32 = 0xFFFF_FFFF;

const BITS_PER_SAMPLE: u16 = 16;

/// Streaming WAV encoder
#[derive(Debug, Default)]
pub struct WaveEncoder {
    params: Option<EncoderParams>,
    header_written: bool,
    pending: Vec<u8>,
}

impl WaveEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_pending(&mut self) -> Result<Vec<Vec<u8>>, EncoderError> {
        let params = self.params.ok_or(EncoderError::NotInitialized("getEncodedData"))?;

        let mut chunk = Vec::with_capacity(WAVE_HEADER_LEN + self.pending.len());
        if !self.header_written {
            chunk.extend_from_slice(&wave_header(params.sample_rate, params.channel_count));
            self.header_written = true;
        }
        chunk.append(&mut self.pending);

        if chunk.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![chunk])
    }
}

impl AudioEncoder for WaveEncoder {
    fn init(&mut self, params: EncoderParams) -> Result<(), EncoderError> {
        if params.channel_count == 0 {
            return Err(EncoderError::InvalidParams("channel count must be positive".into()));
        }
        if params.sample_rate == 0 {
            return Err(EncoderError::InvalidParams("sample rate must be positive".into()));
        }
        self.params = Some(params);
        self.header_written = false;
        self.pending.clear();
        Ok(())
    }

    fn push(&mut self, frame: AudioFrame) -> Result<(), EncoderError> {
        let params = self.params.ok_or(EncoderError::NotInitialized("pushInputData"))?;
        let channels = usize::from(params.channel_count);
        if frame.channel_count() != channels {
            return Err(EncoderError::InvalidInput(format!(
                "expected {} channels, got {}",
                channels,
                frame.channel_count()
            )));
        }

        let buffers = frame.channel_buffers();
        self.pending.reserve(frame.frame_count() * channels * 2);
        for i in 0..frame.frame_count() {
            for buffer in buffers {
                let sample = buffer.get(i).copied().unwrap_or(0.0);
                self.pending.extend_from_slice(&to_pcm16(sample).to_le_bytes());
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<Vec<Vec<u8>>, EncoderError> {
        self.take_pending()
    }

    fn finish(&mut self) -> Result<Vec<Vec<u8>>, EncoderError> {
        let buffers = self.take_pending()?;
        self.params = None;
        Ok(buffers)
    }
}

/// Convert a float sample to 16-bit PCM, clamping to the valid range
pub fn to_pcm16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

fn wave_header(sample_rate: u32, channels: u16) -> [u8; WAVE_HEADER_LEN] {
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * u32::from(block_align);

    let mut header = [0u8; WAVE_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&STREAMING_SIZE.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&STREAMING_SIZE.to_le_bytes());
    header
}

/// Replace the streaming sizes in a complete WAV file with the real ones.
/// Returns false if `bytes` does not start with a header written by
/// [`WaveEncoder`].
pub fn patch_wave_header(bytes: &mut [u8]) -> bool {
    if bytes.len() < WAVE_HEADER_LEN
        || &bytes[0..4] != b"RIFF"
        || &bytes[8..12] != b"WAVE"
        || &bytes[36..40] != b"data"
    {
        return false;
    }

    let clamp = |n: usize| u32::try_from(n).unwrap_or(STREAMING_SIZE);
    let riff_size = clamp(bytes.len() - 8);
    let data_size = clamp(bytes.len() - WAVE_HEADER_LEN);
    bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());
    bytes[40..44].copy_from_slice(&data_size.to_le_bytes());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(channel_count: u16) -> EncoderParams {
        EncoderParams {
            sample_rate: 48000,
            channel_count,
            bits_per_second: None,
        }
    }

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn first_chunk_starts_with_streaming_header() {
        let mut encoder = WaveEncoder::new();
        encoder.init(params(2)).unwrap();
        encoder.push(AudioFrame::silence(2, 10, 48000)).unwrap();

        let chunks = encoder.flush().unwrap();
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.len(), WAVE_HEADER_LEN + 10 * 2 * 2);
        assert_eq!(&chunk[0..4], b"RIFF");
        assert_eq!(read_u32(chunk, 4), STREAMING_SIZE);
        assert_eq!(read_u32(chunk, 24), 48000);
        assert_eq!(read_u32(chunk, 28), 48000 * 4);
        assert_eq!(read_u32(chunk, 40), STREAMING_SIZE);
    }

    #[test]
    fn later_chunks_carry_samples_only() {
        let mut encoder = WaveEncoder::new();
        encoder.init(params(1)).unwrap();
        encoder.push(AudioFrame::silence(1, 4, 48000)).unwrap();
        encoder.flush().unwrap();

        encoder.push(AudioFrame::silence(1, 4, 48000)).unwrap();
        let chunks = encoder.finish().unwrap();
        assert_eq!(chunks, vec![vec![0u8; 8]]);
    }

    #[test]
    fn empty_flush_after_header_yields_nothing() {
        let mut encoder = WaveEncoder::new();
        encoder.init(params(1)).unwrap();
        assert_eq!(encoder.flush().unwrap()[0].len(), WAVE_HEADER_LEN);
        assert!(encoder.flush().unwrap().is_empty());
    }

    #[test]
    fn patched_stream_decodes_as_wav() {
        let mut encoder = WaveEncoder::new();
        encoder.init(params(2)).unwrap();
        encoder
            .push(AudioFrame::new(vec![vec![0.5, -0.5], vec![1.0, -1.0]], 48000))
            .unwrap();
        let mut file = encoder.flush().unwrap().concat();
        encoder.push(AudioFrame::silence(2, 3, 48000)).unwrap();
        file.extend(encoder.finish().unwrap().concat());
        assert!(patch_wave_header(&mut file));

        let reader = hound::WavReader::new(std::io::Cursor::new(file)).unwrap();
        let spec = reader.spec();
        assert_eq!((spec.channels, spec.sample_rate, spec.bits_per_sample), (2, 48000, 16));
        let samples: Vec<i16> = reader.into_samples().map(Result::unwrap).collect();
        assert_eq!(&samples[..4], &[16383, 32767, -16384, -32768]);
        assert_eq!(samples.len(), 10);
    }

    #[test]
    fn samples_are_interleaved() {
        let mut encoder = WaveEncoder::new();
        encoder.init(params(2)).unwrap();
        encoder
            .push(AudioFrame::new(vec![vec![1.0, 0.0], vec![-1.0, 0.0]], 48000))
            .unwrap();
        let chunk = encoder.flush().unwrap().remove(0);
        let samples = &chunk[WAVE_HEADER_LEN..];
        assert_eq!(&samples[0..2], &i16::MAX.to_le_bytes());
        assert_eq!(&samples[2..4], &i16::MIN.to_le_bytes());
        assert_eq!(&samples[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn channel_mismatch_is_invalid_input() {
        let mut encoder = WaveEncoder::new();
        encoder.init(params(2)).unwrap();
        assert!(matches!(
            encoder.push(AudioFrame::silence(1, 4, 48000)),
            Err(EncoderError::InvalidInput(_))
        ));
    }

    #[test]
    fn push_before_init_fails() {
        let mut encoder = WaveEncoder::new();
        assert!(encoder.push(AudioFrame::silence(1, 4, 48000)).is_err());
    }

    #[test]
    fn pcm_conversion_clamps() {
        assert_eq!(to_pcm16(2.0), i16::MAX);
        assert_eq!(to_pcm16(-2.0), i16::MIN);
        assert_eq!(to_pcm16(f32::NAN), 0);
    }

    #[test]
    fn patch_fixes_sizes() {
        let mut encoder = WaveEncoder::new();
        encoder.init(params(1)).unwrap();
        encoder.push(AudioFrame::silence(1, 100, 48000)).unwrap();
        let mut file = encoder.finish().unwrap().concat();

        assert!(patch_wave_header(&mut file));
        assert_eq!(read_u32(&file, 4), (WAVE_HEADER_LEN + 200 - 8) as u32);
        assert_eq!(read_u32(&file, 40), 200);
    }

    #[test]
    fn patch_rejects_foreign_data() {
        let mut bytes = vec![0u8; 64];
        assert!(!patch_wave_header(&mut bytes));
    }
}
