//! In-memory object store.
//!
//! Used by tests and local tooling. Buckets live behind one shared lock, so
//! every client connected from the same backend sees the same objects.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt, stream};

use super::client::{ByteStream, ClientFactory, ObjectClient, ObjectHead, ObjectHeaders};
use super::error::ClientError;

/// Failure injected into the next backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Let the call through. Used to target a later call.
    Skip,
    /// Fail with [`ClientError::NotFound`].
    NotFound,
    /// Fail with [`ClientError::AlreadyExists`].
    AlreadyExists,
    /// Fail with [`ClientError::InvalidCredentials`].
    InvalidCredentials,
    /// Fail with [`ClientError::Conflict`].
    Conflict,
    /// Fail with [`ClientError::Provider`].
    Provider(String),
}

impl Fault {
    fn into_error(self, subject: &str) -> Option<ClientError> {
        match self {
            Self::Skip => None,
            Self::NotFound => Some(ClientError::not_found(subject)),
            Self::AlreadyExists => Some(ClientError::AlreadyExists(subject.to_string())),
            Self::InvalidCredentials => Some(ClientError::InvalidCredentials(
                "the access key id does not exist".to_string(),
            )),
            Self::Conflict => Some(ClientError::Conflict(subject.to_string())),
            Self::Provider(msg) => Some(ClientError::Provider(msg)),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    headers: ObjectHeaders,
    etag: String,
}

#[derive(Debug, Default)]
struct State {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    faults: VecDeque<Fault>,
    versions: u64,
}

/// Shared in-memory object store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<RwLock<State>>,
}

impl InMemoryBackend {
    /// Create an empty backend with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create `bucket`.
    #[must_use]
    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        self.write_state()
            .buckets
            .entry(bucket.into())
            .or_default();
        self
    }

    /// Queue a fault. Each backend call consumes one queued fault.
    pub fn fail_next(&self, fault: Fault) {
        self.write_state().faults.push_back(fault);
    }

    /// Whether `bucket` exists.
    #[must_use]
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.read_state().buckets.contains_key(bucket)
    }

    /// Keys stored in `bucket`, empty if the bucket is missing.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.read_state()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Raw headers stored for `key`.
    #[must_use]
    pub fn headers(&self, bucket: &str, key: &str) -> Option<ObjectHeaders> {
        self.read_state()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.headers.clone())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_etag(&self) -> String {
        let mut state = self.write_state();
        state.versions += 1;
        format!("\"{}\"", state.versions)
    }

    fn injected(&self, subject: &str) -> Result<(), ClientError> {
        let fault = self.write_state().faults.pop_front();
        match fault.and_then(|f| f.into_error(subject)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ClientFactory for InMemoryBackend {
    type Client = InMemoryClient;

    fn connect(&self, bucket: &str) -> Result<InMemoryClient, ClientError> {
        Ok(InMemoryClient {
            backend: self.clone(),
            bucket: bucket.to_string(),
        })
    }
}

/// Client bound to one bucket of an [`InMemoryBackend`].
#[derive(Debug, Clone)]
pub struct InMemoryClient {
    backend: InMemoryBackend,
    bucket: String,
}

impl InMemoryClient {
    fn with_objects<T>(
        &self,
        f: impl FnOnce(&BTreeMap<String, StoredObject>) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let state = self.backend.read_state();
        let objects = state
            .buckets
            .get(&self.bucket)
            .ok_or_else(|| ClientError::not_found(format!("bucket '{}'", self.bucket)))?;
        f(objects)
    }

    fn with_objects_mut<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, StoredObject>) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut state = self.backend.write_state();
        let objects = state
            .buckets
            .get_mut(&self.bucket)
            .ok_or_else(|| ClientError::not_found(format!("bucket '{}'", self.bucket)))?;
        f(objects)
    }

    fn missing(&self, key: &str) -> ClientError {
        ClientError::not_found(format!("'{key}' in bucket '{}'", self.bucket))
    }
}

fn lower_case(headers: ObjectHeaders) -> ObjectHeaders {
    headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect()
}

impl ObjectClient for InMemoryClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<bool, ClientError> {
        self.backend.injected(&self.bucket)?;
        Ok(self.backend.has_bucket(&self.bucket))
    }

    async fn create_bucket(&self) -> Result<(), ClientError> {
        self.backend.injected(&self.bucket)?;
        let mut state = self.backend.write_state();
        if state.buckets.contains_key(&self.bucket) {
            return Err(ClientError::AlreadyExists(self.bucket.clone()));
        }
        state.buckets.insert(self.bucket.clone(), BTreeMap::new());
        Ok(())
    }

    async fn put(
        &self,
        key: &str,
        body: ByteStream,
        headers: ObjectHeaders,
    ) -> Result<u64, ClientError> {
        self.backend.injected(key)?;
        self.with_objects(|_| Ok(()))?;

        let data = body
            .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await?
            .freeze();
        let written = data.len() as u64;
        let etag = self.backend.next_etag();

        self.with_objects_mut(|objects| {
            objects.insert(
                key.to_string(),
                StoredObject {
                    data,
                    headers: lower_case(headers),
                    etag,
                },
            );
            Ok(written)
        })
    }

    async fn get(&self, key: &str) -> Result<ByteStream, ClientError> {
        self.backend.injected(key)?;
        let data = self.with_objects(|objects| {
            objects
                .get(key)
                .map(|object| object.data.clone())
                .ok_or_else(|| self.missing(key))
        })?;
        Ok(stream::once(async move { Ok(data) }).boxed())
    }

    async fn head(&self, key: &str) -> Result<ObjectHead, ClientError> {
        self.backend.injected(key)?;
        self.with_objects(|objects| {
            objects
                .get(key)
                .map(|object| ObjectHead {
                    content_length: object.data.len() as u64,
                    headers: object.headers.clone(),
                    etag: Some(object.etag.clone()),
                })
                .ok_or_else(|| self.missing(key))
        })
    }

    async fn replace_metadata(
        &self,
        key: &str,
        headers: ObjectHeaders,
        if_match: Option<&str>,
    ) -> Result<(), ClientError> {
        self.backend.injected(key)?;
        self.with_objects_mut(|objects| {
            let object = objects.get_mut(key).ok_or_else(|| self.missing(key))?;
            if if_match.is_some_and(|etag| etag != object.etag) {
                return Err(ClientError::Conflict(format!("'{key}' was replaced")));
            }
            object.headers = lower_case(headers);
            Ok(())
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, ClientError> {
        self.backend.injected(key)?;
        self.with_objects(|objects| Ok(objects.contains_key(key)))
    }

    async fn delete(&self, key: &str) -> Result<(), ClientError> {
        self.backend.injected(key)?;
        self.with_objects_mut(|objects| {
            objects.remove(key);
            Ok(())
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ClientError> {
        self.backend.injected(prefix)?;
        self.with_objects(|objects| {
            Ok(objects
                .range(prefix.to_string()..)
                .map(|(key, _)| key)
                .take_while(|key| key.starts_with(prefix))
                .cloned()
                .collect())
        })
    }
}
