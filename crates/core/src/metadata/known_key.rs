//! Bidirectional mapping between known metadata keys and header tokens.

use std::collections::HashMap;

use super::error::MetadataError;

/// Maps a fixed set of known keys to lowercase, hyphen-only header tokens.
///
/// Object stores lower-case metadata header names and only accept a narrow
/// character set in them, so a known key `"Content Type"` is stored under the
/// token `content-type`. Construction fails if two known keys collapse onto
/// the same token.
#[derive(Debug, Clone, Default)]
pub struct KnownKeyEncoder {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl KnownKeyEncoder {
    /// Build an encoder for `keys`.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::EmptyKey`] for an empty key and
    /// [`MetadataError::DuplicateEncoding`] when two distinct keys encode to
    /// the same token.
    pub fn new<I, S>(keys: I) -> Result<Self, MetadataError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut encoder = Self::default();

        for key in keys {
            let key = key.into();
            let encoded = encode(&key)?;

            match encoder.reverse.get(&encoded) {
                Some(existing) if *existing == key => continue,
                Some(_) => return Err(MetadataError::DuplicateEncoding { key, encoded }),
                None => {}
            }

            encoder.forward.insert(key.clone(), encoded.clone());
            encoder.reverse.insert(encoded, key);
        }

        Ok(encoder)
    }

    /// Header token for a known key, `None` if the key is not known.
    #[must_use]
    pub fn try_encode(&self, key: &str) -> Option<&str> {
        self.forward.get(key).map(String::as_str)
    }

    /// Known key for a header token, `None` if the token is not known.
    #[must_use]
    pub fn try_decode(&self, encoded: &str) -> Option<&str> {
        self.reverse.get(encoded).map(String::as_str)
    }

    /// Number of known keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns `true` if no keys are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Lowercase `key` and replace everything outside `[a-z]` with `-`.
fn encode(key: &str) -> Result<String, MetadataError> {
    if key.is_empty() {
        return Err(MetadataError::EmptyKey);
    }

    Ok(key
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() { c } else { '-' })
        .collect())
}
