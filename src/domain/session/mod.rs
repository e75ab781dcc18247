//! Recorder and encoder worker state machines

mod state;
mod worker_state;

pub use state::{InvalidStateTransition, RecorderLifecycle, RecorderState};
pub use worker_state::WorkerState;
