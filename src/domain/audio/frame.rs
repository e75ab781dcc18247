//! Captured audio frames

/// Frames per buffer delivered by capture sources unless configured otherwise
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Format of the audio track a capture source delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSettings {
    /// Channel count reported by the track, if any
    pub channel_count: Option<u16>,
    pub sample_rate: u32,
}

impl TrackSettings {
    pub fn new(channel_count: u16, sample_rate: u32) -> Self {
        Self {
            channel_count: Some(channel_count),
            sample_rate,
        }
    }

    /// Channel count, defaulting to mono when the track does not say
    pub fn channel_count_or_default(&self) -> u16 {
        self.channel_count.filter(|c| *c > 0).unwrap_or(1)
    }
}

/// One fixed-size buffer of planar float samples.
///
/// Deliberately not `Clone`: a frame is moved into the encoder queue and the
/// sender cannot observe it afterwards.
#[derive(Debug, PartialEq)]
pub struct AudioFrame {
    channel_buffers: Vec<Vec<f32>>,
    frame_count: usize,
    duration: f64,
}

impl AudioFrame {
    /// Build a frame from planar channel buffers of equal length
    pub fn new(channel_buffers: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frame_count = channel_buffers.first().map_or(0, Vec::len);
        let duration = if sample_rate == 0 {
            0.0
        } else {
            frame_count as f64 / f64::from(sample_rate)
        };
        Self {
            channel_buffers,
            frame_count,
            duration,
        }
    }

    /// A frame of silence
    pub fn silence(channels: u16, frame_count: usize, sample_rate: u32) -> Self {
        Self::new(vec![vec![0.0; frame_count]; usize::from(channels)], sample_rate)
    }

    pub fn channel_buffers(&self) -> &[Vec<f32>] {
        &self.channel_buffers
    }

    pub fn into_channel_buffers(self) -> Vec<Vec<f32>> {
        self.channel_buffers
    }

    pub fn channel_count(&self) -> usize {
        self.channel_buffers.len()
    }

    /// Samples per channel
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }
}
