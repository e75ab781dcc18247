//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting and the subcommand runners.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod presenter;

// Re-export commonly used types
pub use app::{run_record, run_supported, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, RecordArgs, RecordOptions};
pub use presenter::{Presenter, RecordingProgress};
