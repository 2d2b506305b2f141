//! Object client error types.

use thiserror::Error;

/// Errors reported by an object client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Object or bucket does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Object or bucket already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The provider rejected the credentials.
    #[error("credentials rejected: {0}")]
    InvalidCredentials(String),

    /// The client could not be configured.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The object changed since it was last read.
    #[error("object changed: {0}")]
    Conflict(String),

    /// The provider does not support the operation.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// Any other provider-reported fault.
    #[error("provider error: {0}")]
    Provider(String),

    /// I/O failure while streaming a payload.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a provider error.
    #[must_use]
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Returns `true` if the error reports a missing object or bucket.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if a conditional request lost to a concurrent writer.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<opendal::Error> for ClientError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            opendal::ErrorKind::AlreadyExists => Self::AlreadyExists(err.to_string()),
            opendal::ErrorKind::PermissionDenied => Self::InvalidCredentials(err.to_string()),
            opendal::ErrorKind::ConditionNotMatch => Self::Conflict(err.to_string()),
            // S3 reports a missing bucket as a configuration fault.
            opendal::ErrorKind::ConfigInvalid if err.to_string().contains("NoSuchBucket") => {
                Self::NotFound(err.to_string())
            }
            opendal::ErrorKind::ConfigInvalid => Self::InvalidConfig(err.to_string()),
            opendal::ErrorKind::Unsupported => Self::Unsupported(err.to_string()),
            _ => Self::Provider(err.to_string()),
        }
    }
}
