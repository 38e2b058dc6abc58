//! Error types for the spotter_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for spotter_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No workout plan was supplied, so no session can start
    #[error("No workout plan found: {0}")]
    MissingPlan(String),

    /// Plan data failed ingestion checks
    #[error("Invalid workout plan: {0}")]
    PlanValidation(String),

    /// A manually entered set was rejected
    #[error("Invalid set record: {0}")]
    InvalidRecord(String),

    /// The session has no set with reps > 0, so there is nothing to persist
    #[error("Log at least one set before finishing the workout")]
    EmptyLog,

    /// The persistence collaborator rejected or failed the submission
    #[error("Failed to save workout log: {0}")]
    Submission(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the user can recover from this error without restarting the session
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::EmptyLog | Error::Submission(_) | Error::InvalidRecord(_)
        )
    }
}
