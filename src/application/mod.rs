//! Application layer - Recorder orchestration and port interfaces
//!
//! Contains the recorder state machine, the frame chunker, the encoder
//! channel protocol, and trait definitions for capture sources, encoders
//! and configuration storage.

pub mod chunker;
pub mod encoder_channel;
pub mod events;
pub mod ports;
pub mod recorder;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-export the recorder surface
pub use chunker::{FrameChunker, FrameOutcome};
pub use encoder_channel::{ChannelError, ChannelMessage, ChannelSender, EncoderChannel};
pub use events::{ErrorKind, RecorderEvent};
pub use recorder::{MediaRecorder, RecorderError, RecorderOptions};

/// Lock a mutex, recovering the data if a panicking holder poisoned it
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
