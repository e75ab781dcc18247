//! Domain layer - Core recorder logic
//!
//! Contains value objects, the recorder and worker state machines, MIME
//! negotiation and domain errors. This layer has no dependencies on external
//! systems.

pub mod audio;
pub mod config;
pub mod error;
pub mod mime;
pub mod recording;
pub mod session;

// Re-export common types
pub use audio::{AudioFrame, EncodedChunk, TrackSettings};
pub use config::AppConfig;
pub use error::*;
pub use mime::{is_type_supported, negotiate, EncoderKind, MimeDescriptor, NegotiatedMime};
pub use recording::{Duration, Timeslice, TimesliceAccumulator};
pub use session::{InvalidStateTransition, RecorderLifecycle, RecorderState, WorkerState};
