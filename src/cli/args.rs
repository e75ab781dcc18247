//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::recording::Duration;

/// media-recorder - record audio from the default input device into
/// timesliced, encoded chunks
#[derive(Parser, Debug)]
#[command(name = "media-recorder")]
#[command(version)]
#[command(about = "Record audio from the default input device as WAV, Ogg/Opus or WebM/Opus")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record from the default input device into a file
    Record(RecordArgs),
    /// Check whether MIME types can be recorded
    Supported {
        /// MIME types to check (e.g. "audio/ogg;codecs=opus")
        #[arg(required = true, value_name = "MIME")]
        mime_types: Vec<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options of the record subcommand
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RecordArgs {
    /// Recording duration (e.g. 10s, 1m, 2m30s)
    #[arg(short = 'd', long, value_name = "TIME")]
    pub duration: Option<String>,

    /// Emit a chunk every TIME (e.g. 250ms, 1s); default is one chunk at stop
    #[arg(short = 't', long, value_name = "TIME")]
    pub timeslice: Option<String>,

    /// Container MIME type
    #[arg(short = 'm', long = "mime-type", value_name = "MIME")]
    pub mime_type: Option<String>,

    /// Target audio bitrate hint in bits per second
    #[arg(short = 'b', long = "bits-per-second", value_name = "BITS")]
    pub audio_bits_per_second: Option<u32>,

    /// Output file; defaults to a timestamped name in the output directory
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Resolved record options (defaults < config file < CLI)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOptions {
    pub duration: Duration,
    pub timeslice: Option<Duration>,
    pub mime_type: String,
    pub audio_bits_per_second: Option<u32>,
    pub buffer_size: usize,
    pub output: Option<PathBuf>,
    pub output_dir: PathBuf,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "mime_type",
    "duration",
    "timeslice",
    "audio_bits_per_second",
    "buffer_size",
    "output_dir",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
