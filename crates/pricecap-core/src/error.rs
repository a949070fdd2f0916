use thiserror::Error;

use crate::submissions::SessionId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[from] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}

/// Rejection of untrusted item data before it reaches a draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be non-empty")]
    Empty { field: &'static str },

    #[error("price \"{0}\" is not a decimal number")]
    InvalidPrice(String),

    #[error("price {0} must not be negative")]
    NegativePrice(String),

    #[error("location must be non-empty")]
    EmptyLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no draft item matches the requested entry")]
    NotFound,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("session id {0} already exists in the submission log")]
    IdCollision(SessionId),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("a recording is already in progress")]
    RecordingInProgress,

    #[error("no recording is in progress")]
    NotRecording,

    #[error("a capture location must be selected before submitting")]
    MissingLocation,

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Log(#[from] LogError),
}
