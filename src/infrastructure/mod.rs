//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces: microphone
//! capture through cpal, the built-in encoders, and XDG config storage.

pub mod capture;
pub mod config;
pub mod encoding;

// Re-export adapters
pub use capture::{CpalCapture, ManualCapture};
pub use config::XdgConfigStore;
pub use encoding::{patch_wave_header, DefaultEncoderFactory, WaveEncoder};
