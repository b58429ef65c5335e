//! Error types for the demo harness
//!
//! Errors carry enough context to diagnose a failing scenario from the log
//! alone: the program that failed to start, the payload that failed to parse,
//! the state a session was in when misused.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the demo harness
#[derive(Error, Debug)]
pub enum Error {
    // === Process Errors ===
    #[error("Failed to start '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Demo process did not exit within {0:?} and was terminated")]
    ChildTimeout(std::time::Duration),

    #[error("Demo process exited before receiving input (exit code {0})")]
    PrematureExit(i32),

    #[error("Cannot {action} while process session is {state}")]
    InvalidState { action: String, state: String },

    // === Protocol Errors ===
    #[error("Protocol violation: {message}")]
    Protocol { message: String, payload: String },

    // === Fixture / Suite Errors ===
    #[error("Unknown fixture '{0}'")]
    UnknownFixture(String),

    #[error("Invalid expected digest '{digest}': {reason}")]
    InvalidDigest { digest: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a spawn failure error for the given program
    pub fn spawn_failed(program: &std::path::Path, reason: impl ToString) -> Self {
        Self::SpawnFailed {
            program: program.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a protocol violation carrying the offending payload
    pub fn protocol(message: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            payload: payload.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(action: &str, state: &str) -> Self {
        Self::InvalidState {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    /// Create an invalid digest error
    pub fn invalid_digest(digest: &str, reason: &str) -> Self {
        Self::InvalidDigest {
            digest: digest.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The raw payload attached to a protocol violation, if any
    pub fn payload(&self) -> Option<&str> {
        match self {
            Error::Protocol { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    #[test]
    fn test_spawn_failed_names_program() {
        let err = Error::spawn_failed(Path::new("./gtk-panzoom-demo"), "No such file");
        assert_eq!(
            err.to_string(),
            "Failed to start './gtk-panzoom-demo': No such file"
        );
    }

    #[test]
    fn test_protocol_payload_is_kept_out_of_message() {
        let err = Error::protocol("missing 'builder_models'", "{\"other\":1}");
        assert_eq!(err.to_string(), "Protocol violation: missing 'builder_models'");
        assert_eq!(err.payload(), Some("{\"other\":1}"));
        assert_eq!(Error::ChildTimeout(Duration::from_secs(3)).payload(), None);
    }
}
