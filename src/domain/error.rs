//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid duration format: \"{input}\". Expected <number>ms, <number>s, <number>m or a combination (e.g., 250ms, 1s, 2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when a timeslice argument is out of range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid timeslice: {millis}ms. Timeslice must be 0 or higher")]
pub struct TimesliceError {
    pub millis: i64,
}

/// Error when a MIME type string does not match `type/subtype[;codecs=codec]`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid MIME type: \"{input}\"")]
pub struct MimeParseError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeslice_error_mentions_value() {
        let err = TimesliceError { millis: -5 };
        assert!(err.to_string().contains("-5ms"));
    }

    #[test]
    fn mime_error_quotes_input() {
        let err = MimeParseError {
            input: "audio".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid MIME type: \"audio\"");
    }
}
