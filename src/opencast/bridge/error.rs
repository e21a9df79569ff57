use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Error type covering the failure cases of the reconciliation engine and
/// its collaborators.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Wrapper for IO failures such as reading configuration or media files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failures bubbled up unchanged from the HTTP client.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Raised when a required connection setting is absent or empty.
    #[error("missing configuration setting: {0}")]
    MissingSetting(&'static str),

    /// Raised when the configuration is present but unusable.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The course group is still missing after it was created.
    #[error("missing group '{identifier}' after creation")]
    MissingGroup { identifier: String },

    /// The course series is still missing after it was created.
    #[error("missing series '{title}' after creation")]
    MissingSeries { title: String },

    /// The remote platform refused to create the event.
    #[error("uploading event failed with status {status}")]
    UploadFailed { status: u16 },

    /// Raised when a response that must describe an entity does not.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Raised when an access control list cannot be decoded.
    #[error("invalid ACL: {0}")]
    InvalidAcl(String),

    /// Raised when course metadata is requested for an unknown course.
    #[error("unknown course {0}")]
    UnknownCourse(i64),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
