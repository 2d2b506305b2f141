//! Domain error taxonomy shared by the attachment and subscription stores.

use thiserror::Error;

/// Boxed error cause kept for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using `BusError`.
pub type BusResult<T> = Result<T, BusError>;

/// Errors surfaced to the hosting message bus.
///
/// Only [`BusError::NotFound`] is an expected outcome that callers may
/// recover from. Everything else is a hard failure.
#[derive(Debug, Error)]
pub enum BusError {
    /// Bad or missing credentials, malformed options.
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Unknown attachment id or subscription key.
    #[error("Not found: {what}")]
    NotFound {
        /// Description of the missing item.
        what: String,
        /// Underlying provider cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Caller supplied input the codec refuses to encode.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other provider or transport fault.
    #[error("{operation}: {source}")]
    Application {
        /// Short description of the attempted operation.
        operation: String,
        /// The original fault.
        #[source]
        source: BoxError,
    },
}

impl BusError {
    /// Create a configuration error without a cause.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error wrapping a cause.
    #[must_use]
    pub fn configuration_caused_by(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a not found error without a cause.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            source: None,
        }
    }

    /// Create a not found error wrapping the provider cause.
    #[must_use]
    pub fn not_found_caused_by(what: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::NotFound {
            what: what.into(),
            source: Some(source.into()),
        }
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an application error wrapping the original fault.
    #[must_use]
    pub fn application(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Application {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for errors a caller should treat as a normal outcome.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the stable error code for logs and tooling.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Application { .. } => "APPLICATION_ERROR",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
