//! Attachment (data bus) storage.
//!
//! Large message payloads are stored as objects keyed by attachment id,
//! with caller metadata packed into object headers:
//! - Save: stream a payload in with metadata and a save-time stamp
//! - Read: stamp the read time (unless disabled), then stream the payload out
//! - Read metadata: decode headers and report the stored length

mod identity;
mod service;

pub use identity::{ObjectIdentity, object_key};
pub use service::{AttachmentReader, AttachmentStore};
