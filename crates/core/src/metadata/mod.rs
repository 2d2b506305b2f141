//! Metadata encoding for object stores with restricted headers.
//!
//! Object stores only accept a bounded set of ASCII, case-folded metadata
//! headers. This module packs an arbitrary string map into such headers:
//!
//! ```text
//! known key    "DataBus.SaveTime" = "2026-..."  ->  x-amz-meta-databus-savetime: 2026-...
//! unknown key  "Sender"           = "q@host"    ->  x-amz-meta-0: Sender=q@host
//! ```
//!
//! Decoding is driven by header shape: a header whose token is a known token
//! decodes as that key; any other header is split on the first delimiter.

mod collection;
mod error;
mod factory;
pub mod keys;
mod known_key;

#[cfg(test)]
mod collection_props;

pub use collection::MetadataCollection;
pub use error::MetadataError;
pub use factory::MetadataCollectionFactory;
pub use known_key::KnownKeyEncoder;
