//! Object store access for the attachment and subscription stores.
//!
//! Both stores speak to an [`ObjectClient`], a small bucket-scoped port:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 ObjectClient (one bucket)                     │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │ OpendalClient                │ InMemoryClient                │
//! │ S3, Azure Blob, local fs     │ tests and local tooling       │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! On S3, bucket creation and metadata replacement go through the AWS SDK
//! because OpenDAL has neither.

mod client;
mod error;
mod memory;
mod operator;
mod provision;
mod s3;

pub use client::{
    ByteStream, ClientFactory, ObjectClient, ObjectHead, ObjectHeaders, USER_METADATA_PREFIX,
};
pub use error::ClientError;
pub use memory::{Fault, InMemoryBackend, InMemoryClient};
pub use operator::{OpendalClient, OpendalClientFactory, SIDECAR_ROOT};
pub use provision::ensure_bucket;
