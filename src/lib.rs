//! media-recorder - audio recording into timesliced, encoded chunks
//!
//! A [`MediaRecorder`](application::MediaRecorder) pulls fixed-size buffers
//! from a capture source, moves them into an encoder running on its own
//! thread, and delivers the encoded bytes as events: periodically when a
//! timeslice is configured, on explicit request, and once more at stop.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: MIME descriptors, durations and timeslices, recorder and
//!   encoder states, audio frames and chunks, configuration
//! - **Application**: The recorder state machine, the encoder channel
//!   protocol, and port interfaces (traits)
//! - **Infrastructure**: cpal capture, WAV and Opus encoders, XDG config
//! - **CLI**: Command-line interface and output formatting

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

pub use application::{ErrorKind, MediaRecorder, RecorderError, RecorderEvent, RecorderOptions};
pub use domain::mime::is_type_supported;
