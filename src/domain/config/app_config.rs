//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::audio::DEFAULT_BUFFER_SIZE;
use crate::domain::mime::is_type_supported;
use crate::domain::recording::Duration;

/// MIME type used when nothing is configured
pub const DEFAULT_MIME_TYPE: &str = "audio/wav";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub mime_type: Option<String>,
    pub duration: Option<String>,
    pub timeslice: Option<String>,
    pub audio_bits_per_second: Option<u32>,
    pub buffer_size: Option<usize>,
    pub output_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            mime_type: Some(DEFAULT_MIME_TYPE.to_string()),
            duration: Some("10s".to_string()),
            timeslice: None,
            audio_bits_per_second: None,
            buffer_size: Some(DEFAULT_BUFFER_SIZE),
            output_dir: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            mime_type: other.mime_type.or(self.mime_type),
            duration: other.duration.or(self.duration),
            timeslice: other.timeslice.or(self.timeslice),
            audio_bits_per_second: other.audio_bits_per_second.or(self.audio_bits_per_second),
            buffer_size: other.buffer_size.or(self.buffer_size),
            output_dir: other.output_dir.or(self.output_dir),
        }
    }

    /// Get the MIME type, or the default if not set/unsupported
    pub fn mime_type_or_default(&self) -> &str {
        self.mime_type
            .as_deref()
            .filter(|mime| is_type_supported(mime))
            .unwrap_or(DEFAULT_MIME_TYPE)
    }

    /// Get duration as parsed Duration, or default if not set/invalid
    pub fn duration_or_default(&self) -> Duration {
        self.duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_duration)
    }

    /// Get timeslice as parsed Duration; `None` means flush only at stop
    pub fn timeslice_or_default(&self) -> Option<Duration> {
        self.timeslice.as_ref().and_then(|s| s.parse().ok())
    }

    /// Get capture buffer size, or 4096 frames if not set/zero
    pub fn buffer_size_or_default(&self) -> usize {
        self.buffer_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    /// Get output directory, or the current directory if not set
    pub fn output_dir_or_default(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
