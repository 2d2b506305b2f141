//! Logical metadata map and its physical header encoding.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::error::MetadataError;
use super::known_key::KnownKeyEncoder;
use crate::storage::{ObjectHeaders, USER_METADATA_PREFIX};

/// Flat string metadata for one store operation.
///
/// Entries keep insertion order so that repeated saves of an unchanged
/// collection assign the same indexed header to the same key.
///
/// Physical encoding, under [`USER_METADATA_PREFIX`]:
/// - known key `K` with value `V`: header `<token(K)>` holding `V`
/// - any other key: header `<n>` holding `K<delimiter>V`, `n` counting from 0
#[derive(Debug, Clone)]
pub struct MetadataCollection {
    delimiter: char,
    encoder: Arc<KnownKeyEncoder>,
    entries: Vec<(String, String)>,
}

impl MetadataCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new(delimiter: char, encoder: Arc<KnownKeyEncoder>) -> Self {
        Self {
            delimiter,
            encoder,
            entries: Vec::new(),
        }
    }

    /// Value for `key`, `None` if absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Add or override an entry. Overriding keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the collection holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Point-in-time copy of all entries.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.entries.iter().cloned().collect()
    }

    /// Decode every user metadata header in `headers` into this collection.
    ///
    /// Headers outside the user metadata prefix are ignored. Headers that are
    /// neither a known token nor `key<delimiter>value` are dropped.
    pub fn load_from(&mut self, headers: &ObjectHeaders) {
        for (name, value) in headers {
            let Some(token) = name.strip_prefix(USER_METADATA_PREFIX) else {
                continue;
            };

            if let Some(key) = self.encoder.try_decode(token) {
                let key = key.to_string();
                self.insert(key, value.clone());
                continue;
            }

            match value.split_once(self.delimiter) {
                Some((key, value)) => self.insert(key, value),
                None => warn!(header = %name, "Dropping undecodable metadata header"),
            }
        }
    }

    /// Encode every entry into `headers`.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::DelimiterInKey`] if an unknown key contains the
    /// delimiter. `headers` is left untouched in that case.
    pub fn save_to(&self, headers: &mut ObjectHeaders) -> Result<(), MetadataError> {
        if let Some((key, _)) = self
            .entries
            .iter()
            .find(|(k, _)| self.encoder.try_encode(k).is_none() && k.contains(self.delimiter))
        {
            return Err(MetadataError::DelimiterInKey {
                key: key.clone(),
                delimiter: self.delimiter,
            });
        }

        let mut index = 0usize;
        for (key, value) in &self.entries {
            match self.encoder.try_encode(key) {
                Some(token) => {
                    headers.insert(format!("{USER_METADATA_PREFIX}{token}"), value.clone());
                }
                None => {
                    headers.insert(
                        format!("{USER_METADATA_PREFIX}{index}"),
                        format!("{key}{}{value}", self.delimiter),
                    );
                    index += 1;
                }
            }
        }

        Ok(())
    }
}

impl<K, V> Extend<(K, V)> for MetadataCollection
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIMITER: char = '=';
    const KNOWN_KEY: &str = "This Is A Known Key";
    const KNOWN_KEY_ENCODED: &str = "this-is-a-known-key";

    fn collection() -> MetadataCollection {
        let encoder = KnownKeyEncoder::new([KNOWN_KEY]).expect("valid known keys");
        MetadataCollection::new(DELIMITER, Arc::new(encoder))
    }

    /// Builds physical headers the way a store would hold them.
    #[derive(Default)]
    struct HeaderBuilder {
        headers: ObjectHeaders,
        index: usize,
    }

    impl HeaderBuilder {
        fn indexed(mut self, key: &str, value: &str) -> Self {
            self.headers.insert(
                format!("{USER_METADATA_PREFIX}{}", self.index),
                format!("{key}{DELIMITER}{value}"),
            );
            self.index += 1;
            self
        }

        fn known(mut self, encoded: &str, value: &str) -> Self {
            self.headers
                .insert(format!("{USER_METADATA_PREFIX}{encoded}"), value.to_string());
            self
        }

        fn raw(mut self, name: &str, value: &str) -> Self {
            self.headers.insert(name.to_string(), value.to_string());
            self
        }

        fn build(self) -> ObjectHeaders {
            self.headers
        }
    }

    #[test]
    fn test_initially_empty() {
        let collection = collection();
        assert!(collection.is_empty());
        assert_eq!(collection.len(), 0);
        assert_eq!(collection.get("missing"), None);
    }

    #[test]
    fn test_decodes_indexed_entries() {
        let headers = HeaderBuilder::default().indexed("Some Key", "Some Value").build();
        let mut collection = collection();
        collection.load_from(&headers);

        let map = collection.to_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Some Key").map(String::as_str), Some("Some Value"));
    }

    #[test]
    fn test_decodes_known_entries() {
        let headers = HeaderBuilder::default()
            .known(KNOWN_KEY_ENCODED, "Some Value")
            .build();
        let mut collection = collection();
        collection.load_from(&headers);

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get(KNOWN_KEY), Some("Some Value"));
    }

    #[test]
    fn test_decodes_known_and_indexed_entries() {
        let headers = HeaderBuilder::default()
            .indexed("Indexed Key", "Indexed Value")
            .known(KNOWN_KEY_ENCODED, "Known Value")
            .build();
        let mut collection = collection();
        collection.load_from(&headers);

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get("Indexed Key"), Some("Indexed Value"));
        assert_eq!(collection.get(KNOWN_KEY), Some("Known Value"));
    }

    #[test]
    fn test_value_splits_on_first_delimiter_only() {
        let headers = HeaderBuilder::default()
            .raw("x-amz-meta-0", "SomeKey=Legal=Value")
            .build();
        let mut collection = collection();
        collection.load_from(&headers);
        assert_eq!(collection.get("SomeKey"), Some("Legal=Value"));
    }

    #[test]
    fn test_skips_foreign_and_undecodable_headers() {
        let headers = HeaderBuilder::default()
            .raw("content-type", "application/octet-stream")
            .raw("x-amz-meta-0", "no delimiter here")
            .raw("x-amz-meta-unknown-token", "also no delimiter")
            .indexed("Kept", "yes")
            .build();
        let mut collection = collection();
        collection.load_from(&headers);

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("Kept"), Some("yes"));
    }

    #[test]
    fn test_encodes_indexed_entries() {
        let mut collection = collection();
        collection.insert("Some Key", "Some Value");

        let mut headers = ObjectHeaders::new();
        collection.save_to(&mut headers).expect("legal key");

        assert_eq!(headers.len(), 1);
        assert_eq!(
            headers.get("x-amz-meta-0").map(String::as_str),
            Some("Some Key=Some Value")
        );
    }

    #[test]
    fn test_encodes_known_entries() {
        let mut collection = collection();
        collection.insert(KNOWN_KEY, "Known Value");

        let mut headers = ObjectHeaders::new();
        collection.save_to(&mut headers).expect("known key");

        assert_eq!(headers.len(), 1);
        let name = format!("{USER_METADATA_PREFIX}{KNOWN_KEY_ENCODED}");
        assert_eq!(headers.get(&name).map(String::as_str), Some("Known Value"));
    }

    #[test]
    fn test_known_key_may_contain_delimiter() {
        let encoder = KnownKeyEncoder::new(["a=b"]).expect("valid known keys");
        let mut collection = MetadataCollection::new(DELIMITER, Arc::new(encoder));
        collection.insert("a=b", "v");

        let mut headers = ObjectHeaders::new();
        collection.save_to(&mut headers).expect("known keys are exempt");
        assert_eq!(headers.get("x-amz-meta-a-b").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_rejects_delimiter_in_unknown_key() {
        let mut collection = collection();
        collection.insert("Fine", "1");
        collection.insert("Illegal=Key", "x");

        let mut headers = ObjectHeaders::new();
        let err = collection.save_to(&mut headers).unwrap_err();

        assert_eq!(
            err,
            MetadataError::DelimiterInKey {
                key: "Illegal=Key".to_string(),
                delimiter: '=',
            }
        );
        assert!(headers.is_empty());
    }

    #[test]
    fn test_indices_follow_insertion_order() {
        let mut collection = collection();
        collection.insert("b", "2");
        collection.insert(KNOWN_KEY, "k");
        collection.insert("a", "1");
        collection.insert("b", "3");

        let mut headers = ObjectHeaders::new();
        collection.save_to(&mut headers).expect("legal keys");

        assert_eq!(headers.get("x-amz-meta-0").map(String::as_str), Some("b=3"));
        assert_eq!(headers.get("x-amz-meta-1").map(String::as_str), Some("a=1"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_extend_and_remove() {
        let mut collection = collection();
        collection.extend([("a", "1"), ("b", "2")]);
        assert_eq!(collection.remove("a"), Some("1".to_string()));
        assert_eq!(collection.remove("a"), None);
        assert_eq!(collection.iter().collect::<Vec<_>>(), vec![("b", "2")]);
    }
}
