//! Metadata codec error types.

use bucketbus_shared::BusError;
use thiserror::Error;

/// Metadata encoding errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    /// Two known keys collapse onto the same header token.
    #[error("set of known keys contains two keys that map to the same encoded key ('{key}' => '{encoded}')")]
    DuplicateEncoding {
        /// The second key that produced the token.
        key: String,
        /// The shared token.
        encoded: String,
    },

    /// Known keys must not be empty.
    #[error("known metadata key cannot be empty")]
    EmptyKey,

    /// An unknown key uses the reserved delimiter.
    #[error("metadata key '{key}' must not contain delimiter '{delimiter}'")]
    DelimiterInKey {
        /// The offending key.
        key: String,
        /// The configured delimiter.
        delimiter: char,
    },
}

impl From<MetadataError> for BusError {
    fn from(err: MetadataError) -> Self {
        BusError::validation(err.to_string())
    }
}
