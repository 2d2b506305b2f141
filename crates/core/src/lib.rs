//! Object store backed infrastructure for a message bus.
//!
//! This crate stores large message payloads ("attachments") and the topic
//! subscription index in an object store bucket.
//!
//! # Modules
//!
//! - `metadata` - Packing string metadata into restricted object headers
//! - `storage` - The object client port with OpenDAL and in-memory adapters
//! - `attachment` - Attachment store: save, read, read metadata
//! - `subscription` - Subscription index store
//! - `ports` - Capability traits the hosting bus depends on
//! - `clock` - Time source for save and read stamps

pub mod attachment;
pub mod clock;
pub mod fault;
pub mod metadata;
pub mod ports;
pub mod storage;
pub mod subscription;

pub use attachment::{AttachmentReader, AttachmentStore, ObjectIdentity};
pub use clock::{Clock, FixedClock, SystemClock};
pub use ports::{DataBusStorage, SubscriptionStorage};
pub use storage::{ClientError, InMemoryBackend, OpendalClientFactory};
pub use subscription::SubscriptionStore;
