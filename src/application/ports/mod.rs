//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod encoder;

// Re-export common types
pub use capture::{CaptureError, CaptureSource, FrameSink};
pub use config::ConfigStore;
pub use encoder::{
    AudioEncoder, EncoderCommand, EncoderError, EncoderFactory, EncoderParams, EncoderResponse,
};
