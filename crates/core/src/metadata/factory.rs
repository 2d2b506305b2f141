//! Builds metadata collections configured for one attachment store.

use std::collections::BTreeSet;
use std::sync::Arc;

use bucketbus_shared::AttachmentOptions;

use super::collection::MetadataCollection;
use super::error::MetadataError;
use super::keys;
use super::known_key::KnownKeyEncoder;

/// Produces fresh, empty [`MetadataCollection`]s sharing one immutable
/// known-key encoder (built-in keys plus configured keys).
#[derive(Debug, Clone)]
pub struct MetadataCollectionFactory {
    delimiter: char,
    encoder: Arc<KnownKeyEncoder>,
}

impl MetadataCollectionFactory {
    /// Create a factory from attachment options.
    ///
    /// # Errors
    ///
    /// Returns an error if the known keys collide after encoding.
    pub fn new(options: &AttachmentOptions) -> Result<Self, MetadataError> {
        let known: BTreeSet<&str> = keys::BUILT_IN
            .into_iter()
            .chain(options.known_metadata_keys.iter().map(String::as_str))
            .collect();

        Ok(Self {
            delimiter: options.metadata_delimiter,
            encoder: Arc::new(KnownKeyEncoder::new(known)?),
        })
    }

    /// A new empty collection.
    #[must_use]
    pub fn create(&self) -> MetadataCollection {
        MetadataCollection::new(self.delimiter, Arc::clone(&self.encoder))
    }

    /// Delimiter used for unknown keys.
    #[must_use]
    pub fn delimiter(&self) -> char {
        self.delimiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ObjectHeaders;

    fn options() -> AttachmentOptions {
        AttachmentOptions::new("attachments").expect("valid bucket")
    }

    #[test]
    fn test_built_in_keys_are_always_known() {
        let factory = MetadataCollectionFactory::new(&options()).expect("no collisions");
        let mut collection = factory.create();
        collection.insert(keys::SAVE_TIME, "2026-01-15T08:30:00Z");
        collection.insert(keys::CONTENT_ENCODING, "gzip");

        let mut headers = ObjectHeaders::new();
        collection.save_to(&mut headers).expect("known keys");

        assert_eq!(
            headers.get("x-amz-meta-databus-savetime").map(String::as_str),
            Some("2026-01-15T08:30:00Z")
        );
        assert_eq!(
            headers.get("x-amz-meta-databus-contentencoding").map(String::as_str),
            Some("gzip")
        );
    }

    #[test]
    fn test_configured_keys_are_known() {
        let options = options().with_known_keys(["Sender Address"]);
        let factory = MetadataCollectionFactory::new(&options).expect("no collisions");
        let mut collection = factory.create();
        collection.insert("Sender Address", "queue@machine");

        let mut headers = ObjectHeaders::new();
        collection.save_to(&mut headers).expect("known key");
        assert!(headers.contains_key("x-amz-meta-sender-address"));
    }

    #[test]
    fn test_configured_key_colliding_with_built_in_is_rejected() {
        let options = options().with_known_keys(["databus savetime"]);
        let err = MetadataCollectionFactory::new(&options).unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateEncoding { .. }));
    }

    #[test]
    fn test_collections_do_not_share_entries() {
        let factory = MetadataCollectionFactory::new(&options()).expect("no collisions");
        let mut first = factory.create();
        first.insert("a", "1");
        let second = factory.create();
        assert!(second.is_empty());
    }

    #[test]
    fn test_custom_delimiter_is_used() {
        let options = options().with_delimiter('|');
        let factory = MetadataCollectionFactory::new(&options).expect("no collisions");
        assert_eq!(factory.delimiter(), '|');

        let mut collection = factory.create();
        collection.insert("a=b", "c");
        let mut headers = ObjectHeaders::new();
        collection.save_to(&mut headers).expect("'=' is legal with '|'");
        assert_eq!(headers.get("x-amz-meta-0").map(String::as_str), Some("a=b|c"));
    }
}
