//! Encoder worker lifecycle, tracked independently of the recorder state

use std::fmt;

/// State of one encoder worker as seen from the recorder side.
///
///   INACTIVE -> READY_TO_INIT (worker finished setup)
///   READY_TO_INIT -> ENCODING (init sent)
///   any -> CLOSED (final chunk received, or worker fault)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkerState {
    #[default]
    Inactive,
    ReadyToInit,
    Encoding,
    Closed,
}

impl WorkerState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::ReadyToInit => "readyToInit",
            Self::Encoding => "encoding",
            Self::Closed => "closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        *self == Self::Closed
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
