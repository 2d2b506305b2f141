//! The object client port.

use std::collections::BTreeMap;
use std::future::Future;

use bytes::Bytes;
use futures::stream::BoxStream;

use super::error::ClientError;

/// Prefix of every user metadata header.
pub const USER_METADATA_PREFIX: &str = "x-amz-meta-";

/// Object headers keyed by lower-case header name.
pub type ObjectHeaders = BTreeMap<String, String>;

/// Streamed object payload.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// What a metadata-only request returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHead {
    /// Payload size in bytes.
    pub content_length: u64,
    /// User metadata headers, names carrying [`USER_METADATA_PREFIX`].
    pub headers: ObjectHeaders,
    /// Entity tag of the stored version, when the service reports one.
    pub etag: Option<String>,
}

/// A connection to one bucket of an object store.
///
/// Every key is relative to the bucket. Operations on a missing object or
/// bucket fail with [`ClientError::NotFound`].
pub trait ObjectClient: Send + Sync {
    /// Name of the bucket this client talks to.
    fn bucket(&self) -> &str;

    /// Whether the bucket exists.
    fn bucket_exists(&self) -> impl Future<Output = Result<bool, ClientError>> + Send;

    /// Create the bucket. Fails with [`ClientError::AlreadyExists`] if another
    /// writer created it first.
    fn create_bucket(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Store `body` under `key` with `headers`, replacing any existing object.
    /// Returns the number of bytes written.
    fn put(
        &self,
        key: &str,
        body: ByteStream,
        headers: ObjectHeaders,
    ) -> impl Future<Output = Result<u64, ClientError>> + Send;

    /// Stream the payload stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<ByteStream, ClientError>> + Send;

    /// Size and user metadata of `key` without its payload.
    fn head(&self, key: &str) -> impl Future<Output = Result<ObjectHead, ClientError>> + Send;

    /// Replace the user metadata of `key`, leaving its payload unchanged.
    ///
    /// With `if_match` set, fails with [`ClientError::Conflict`] when the
    /// stored version no longer carries that entity tag.
    fn replace_metadata(
        &self,
        key: &str,
        headers: ObjectHeaders,
        if_match: Option<&str>,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Whether an object is stored under `key`.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, ClientError>> + Send;

    /// Remove the object under `key`. Removing a missing object succeeds.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Every key starting with `prefix`, in lexicographic order.
    fn list(&self, prefix: &str) -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;
}

/// Opens [`ObjectClient`]s bound to a bucket.
///
/// Any `Fn(&str) -> Result<C, ClientError>` is a factory, which lets tests
/// hand a store a closure.
pub trait ClientFactory: Send + Sync {
    /// Client type produced.
    type Client: ObjectClient;

    /// Open a client for `bucket`.
    fn connect(&self, bucket: &str) -> Result<Self::Client, ClientError>;
}

impl<F, C> ClientFactory for F
where
    F: Fn(&str) -> Result<C, ClientError> + Send + Sync,
    C: ObjectClient,
{
    type Client = C;

    fn connect(&self, bucket: &str) -> Result<C, ClientError> {
        self(bucket)
    }
}
