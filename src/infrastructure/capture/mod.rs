//! Capture infrastructure module
//!
//! Provides live microphone capture through cpal and a manually driven
//! source for tests and embedding.

mod cpal_capture;
mod manual;

pub use cpal_capture::{CpalCapture, FrameAssembler};
pub use manual::ManualCapture;
