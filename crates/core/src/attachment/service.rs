//! Attachment store implementation.

use std::collections::HashMap;

use bucketbus_shared::{AttachmentOptions, BusResult};
use bytes::Bytes;
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, info};

use super::identity::ObjectIdentity;
use crate::clock::{Clock, SystemClock, format_timestamp};
use crate::fault::translate;
use crate::metadata::{MetadataCollectionFactory, keys};
use crate::storage::{ByteStream, ClientFactory, ObjectClient, ObjectHeaders, ensure_bucket};

/// Payload stream returned by [`AttachmentStore::read`].
pub type AttachmentReader = StreamReader<ByteStream, Bytes>;

/// Stores attachments as objects in one bucket.
///
/// Every operation connects its own client and builds its own metadata
/// collection, so a store can be shared freely between tasks.
pub struct AttachmentStore<F: ClientFactory, C: Clock = SystemClock> {
    factory: F,
    clock: C,
    options: AttachmentOptions,
    metadata: MetadataCollectionFactory,
}

impl<F: ClientFactory> AttachmentStore<F> {
    /// Create a store stamping times from the system clock.
    ///
    /// Creates the bucket when `auto_create_bucket` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid, the known metadata keys
    /// collide, or the bucket cannot be provisioned.
    pub async fn new(factory: F, options: AttachmentOptions) -> BusResult<Self> {
        Self::with_clock(factory, options, SystemClock).await
    }
}

impl<F: ClientFactory, C: Clock> AttachmentStore<F, C> {
    /// Create a store with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`AttachmentStore::new`].
    pub async fn with_clock(factory: F, options: AttachmentOptions, clock: C) -> BusResult<Self> {
        options.validate()?;
        let metadata = MetadataCollectionFactory::new(&options)?;

        let store = Self {
            factory,
            clock,
            options,
            metadata,
        };

        if store.options.auto_create_bucket {
            let client = store.client()?;
            ensure_bucket(&client)
                .await
                .map_err(|e| translate(e, "provision bucket", &store.options.bucket_name))?;
        }

        info!(bucket = %store.options.bucket_name, "Attachment store ready");
        Ok(store)
    }

    /// Options this store was built with.
    #[must_use]
    pub fn options(&self) -> &AttachmentOptions {
        &self.options
    }

    /// Identity of attachment `id` under this store's key layout.
    #[must_use]
    pub fn identity(&self, id: &str) -> ObjectIdentity {
        ObjectIdentity::new(id, &self.options)
    }

    fn client(&self) -> BusResult<F::Client> {
        self.factory
            .connect(&self.options.bucket_name)
            .map_err(|e| translate(e, "connect to bucket", &self.options.bucket_name))
    }

    /// Store the payload read from `source` under `id`.
    ///
    /// The metadata is stored alongside the payload together with a
    /// save-time stamp. A caller-supplied length is dropped, as the length is
    /// always derived from the stored payload. An existing attachment with
    /// the same id is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`bucketbus_shared::BusError::Validation`] before any I/O if a metadata key
    /// contains the delimiter. Store faults are translated.
    pub async fn save<R>(
        &self,
        id: &str,
        source: R,
        metadata: Option<HashMap<String, String>>,
    ) -> BusResult<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let identity = self.identity(id);

        let mut collection = self.metadata.create();
        if let Some(metadata) = metadata {
            collection.extend(metadata);
        }
        collection.remove(keys::LENGTH);
        collection.insert(keys::SAVE_TIME, format_timestamp(self.clock.now()));

        let mut headers = ObjectHeaders::new();
        collection.save_to(&mut headers)?;

        let client = self.client()?;
        let bytes = client
            .put(&identity.key, ReaderStream::new(source).boxed(), headers)
            .await
            .map_err(|e| translate(e, "save attachment", id))?;

        debug!(key = %identity.key, bytes, "Attachment saved");
        Ok(())
    }

    /// Open the payload of `id` for reading.
    ///
    /// Stamps the read time first unless `do_not_update_last_read_time` is
    /// set. The stamp and the payload fetch are separate requests. The stamp
    /// only applies to the version it was computed from; when a concurrent
    /// save replaced the object in between, the stamp is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`bucketbus_shared::BusError::NotFound`] if no attachment is stored under `id`.
    pub async fn read(&self, id: &str) -> BusResult<AttachmentReader> {
        let identity = self.identity(id);
        let client = self.client()?;

        if !self.options.do_not_update_last_read_time {
            self.update_read_time(&client, &identity).await?;
        }

        let stream = client
            .get(&identity.key)
            .await
            .map_err(|e| translate(e, "read attachment", id))?;

        debug!(key = %identity.key, "Attachment opened");
        Ok(StreamReader::new(stream))
    }

    async fn update_read_time(
        &self,
        client: &F::Client,
        identity: &ObjectIdentity,
    ) -> BusResult<()> {
        let head = client
            .head(&identity.key)
            .await
            .map_err(|e| translate(e, "read metadata of attachment", &identity.id))?;

        let mut collection = self.metadata.create();
        collection.load_from(&head.headers);
        collection.insert(keys::READ_TIME, format_timestamp(self.clock.now()));

        let mut headers = ObjectHeaders::new();
        collection.save_to(&mut headers)?;

        match client
            .replace_metadata(&identity.key, headers, head.etag.as_deref())
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_conflict() => {
                debug!(key = %identity.key, "Attachment replaced while stamping read time");
                Ok(())
            }
            Err(e) => Err(translate(e, "update read time of attachment", &identity.id)),
        }
    }

    /// Metadata of `id`, without transferring the payload.
    ///
    /// The result also holds [`keys::LENGTH`], the stored payload size.
    /// The read time is not updated.
    ///
    /// # Errors
    ///
    /// Returns [`bucketbus_shared::BusError::NotFound`] if no attachment is stored under `id`.
    pub async fn read_metadata(&self, id: &str) -> BusResult<HashMap<String, String>> {
        let identity = self.identity(id);
        let client = self.client()?;

        let head = client
            .head(&identity.key)
            .await
            .map_err(|e| translate(e, "read metadata of attachment", id))?;

        let mut collection = self.metadata.create();
        collection.load_from(&head.headers);
        collection.insert(keys::LENGTH, head.content_length.to_string());
        Ok(collection.to_map())
    }
}

impl<F: ClientFactory, C: Clock> std::fmt::Debug for AttachmentStore<F, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentStore")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
