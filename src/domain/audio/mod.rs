//! Audio domain module

mod chunk;
mod frame;

pub use chunk::{format_size, EncodedChunk};
pub use frame::{AudioFrame, TrackSettings, DEFAULT_BUFFER_SIZE};
