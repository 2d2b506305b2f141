//! Property-based tests for the metadata codec.
//!
//! - Round-trip: decode(encode(M)) == M for keys free of the delimiter
//! - Determinism: encoding an unchanged collection twice yields equal headers
//! - Known-key transparency: known values are stored verbatim
//! - Delimiter rejection: unknown keys containing the delimiter never encode

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;

use super::collection::MetadataCollection;
use super::error::MetadataError;
use super::known_key::KnownKeyEncoder;
use crate::storage::{ObjectHeaders, USER_METADATA_PREFIX};

const DELIMITER: char = '=';
const KNOWN: [&str; 2] = ["Content Type", "Sender Address"];

fn collection() -> MetadataCollection {
    let encoder = KnownKeyEncoder::new(KNOWN).expect("distinct tokens");
    MetadataCollection::new(DELIMITER, Arc::new(encoder))
}

/// Unknown keys: printable ASCII without the delimiter, never a known key.
fn unknown_key() -> impl Strategy<Value = String> {
    "[ -<>-~]{0,24}".prop_filter("must not be a known key", |k| !KNOWN.contains(&k.as_str()))
}

/// Values may contain anything printable, the delimiter included.
fn value() -> impl Strategy<Value = String> {
    "[ -~]{0,48}"
}

fn metadata() -> impl Strategy<Value = HashMap<String, String>> {
    prop::collection::hash_map(unknown_key(), value(), 0..12)
}

proptest! {
    #[test]
    fn prop_round_trip(entries in metadata(), known_value in prop::option::of(value())) {
        let mut source = collection();
        source.extend(entries.clone());
        if let Some(v) = &known_value {
            source.insert(KNOWN[0], v.clone());
        }

        let mut headers = ObjectHeaders::new();
        source.save_to(&mut headers).expect("keys are free of the delimiter");

        let mut decoded = collection();
        decoded.load_from(&headers);

        let mut expected = entries;
        if let Some(v) = known_value {
            expected.insert(KNOWN[0].to_string(), v);
        }
        prop_assert_eq!(decoded.to_map(), expected);
    }

    #[test]
    fn prop_encoding_is_deterministic(entries in metadata()) {
        let mut source = collection();
        source.extend(entries);

        let mut first = ObjectHeaders::new();
        let mut second = ObjectHeaders::new();
        source.save_to(&mut first).expect("legal keys");
        source.save_to(&mut second).expect("legal keys");

        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_known_values_are_stored_verbatim(v in value()) {
        let mut source = collection();
        source.insert(KNOWN[1], v.clone());

        let mut headers = ObjectHeaders::new();
        source.save_to(&mut headers).expect("known key");

        let name = format!("{USER_METADATA_PREFIX}sender-address");
        prop_assert_eq!(headers.get(&name), Some(&v));
        prop_assert_eq!(headers.len(), 1);
    }

    #[test]
    fn prop_delimiter_in_unknown_key_is_rejected(
        head in "[a-z]{0,8}",
        tail in "[a-z]{0,8}",
        v in value(),
    ) {
        let key = format!("{head}{DELIMITER}{tail}");
        let mut source = collection();
        source.insert(key.clone(), v);

        let mut headers = ObjectHeaders::new();
        let result = source.save_to(&mut headers);

        prop_assert_eq!(result, Err(MetadataError::DelimiterInKey { key, delimiter: DELIMITER }));
        prop_assert!(headers.is_empty());
    }
}
