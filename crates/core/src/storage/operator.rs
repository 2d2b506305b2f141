//! Object client backed by Apache OpenDAL.

use bucketbus_shared::StorageProvider;
use futures::{StreamExt, TryStreamExt};
use opendal::{ErrorKind, Operator, Writer, services};
use tracing::warn;

use super::client::{
    ByteStream, ClientFactory, ObjectClient, ObjectHead, ObjectHeaders, USER_METADATA_PREFIX,
};
use super::error::ClientError;
use super::s3::S3Control;

/// Directory under the local root holding uploads until they complete.
const LOCAL_UPLOAD_DIR: &str = ".uploads";

/// Builds one [`OpendalClient`] per bucket from a provider configuration.
#[derive(Debug, Clone)]
pub struct OpendalClientFactory {
    provider: StorageProvider,
}

impl OpendalClientFactory {
    /// Create a factory for `provider`.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self { provider }
    }

    /// Provider this factory connects to.
    #[must_use]
    pub fn provider(&self) -> &StorageProvider {
        &self.provider
    }
}

impl ClientFactory for OpendalClientFactory {
    type Client = OpendalClient;

    fn connect(&self, bucket: &str) -> Result<OpendalClient, ClientError> {
        let operator = create_operator(&self.provider, bucket)?;
        let (local_prefix, s3) = match &self.provider {
            StorageProvider::S3 {
                endpoint,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let control = S3Control::new(
                    access_key_id,
                    secret_access_key,
                    region,
                    endpoint.as_deref(),
                    bucket,
                );
                (None, Some(control))
            }
            StorageProvider::AzureBlob { .. } => (None, None),
            StorageProvider::LocalFs { .. } => (Some(format!("{bucket}/")), None),
        };

        Ok(OpendalClient {
            operator,
            bucket: bucket.to_string(),
            local_prefix,
            s3,
        })
    }
}

/// Create the OpenDAL operator for `bucket`.
///
/// The bucket maps to an S3 bucket or an Azure container. The local
/// operator is rooted at the provider root and serves every bucket.
fn create_operator(provider: &StorageProvider, bucket: &str) -> Result<Operator, ClientError> {
    match provider {
        StorageProvider::S3 {
            endpoint,
            access_key_id,
            secret_access_key,
            region,
        } => {
            let mut builder = services::S3::default()
                .bucket(bucket)
                .access_key_id(access_key_id)
                .secret_access_key(secret_access_key)
                .region(region);
            if let Some(endpoint) = endpoint {
                builder = builder.endpoint(endpoint);
            }

            Operator::new(builder)?.finish().pipe(Ok)
        }
        StorageProvider::AzureBlob {
            account,
            access_key,
            endpoint,
        } => {
            let endpoint = endpoint
                .clone()
                .unwrap_or_else(|| format!("https://{account}.blob.core.windows.net"));
            let builder = services::Azblob::default()
                .account_name(account)
                .account_key(access_key)
                .container(bucket)
                .endpoint(&endpoint);

            Operator::new(builder)?.finish().pipe(Ok)
        }
        StorageProvider::LocalFs { root } => {
            let invalid = || ClientError::InvalidConfig("invalid path".to_string());
            let uploads = root.join(LOCAL_UPLOAD_DIR);
            let builder = services::Fs::default()
                .root(root.to_str().ok_or_else(invalid)?)
                .atomic_write_dir(uploads.to_str().ok_or_else(invalid)?);

            Operator::new(builder)?.finish().pipe(Ok)
        }
    }
}

/// [`ObjectClient`] over one OpenDAL operator.
///
/// On S3, user metadata travels as `x-amz-meta-*` headers and bucket
/// creation and metadata replacement use [`S3Control`]. Azure metadata names
/// must be identifiers, which the indexed encoding is not, so Azure and the
/// local filesystem keep headers in a JSON sidecar under [`SIDECAR_ROOT`].
/// A local bucket is a directory under the root. Azure containers must be
/// provisioned out of band.
#[derive(Debug, Clone)]
pub struct OpendalClient {
    operator: Operator,
    bucket: String,
    local_prefix: Option<String>,
    s3: Option<S3Control>,
}

/// Root of metadata sidecars, outside every local bucket directory.
pub const SIDECAR_ROOT: &str = ".metadata/";

impl OpendalClient {
    /// The underlying operator.
    #[must_use]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    fn uses_sidecar(&self) -> bool {
        self.s3.is_none()
    }

    fn path(&self, key: &str) -> String {
        match &self.local_prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        }
    }

    fn key<'a>(&self, path: &'a str) -> Option<&'a str> {
        match &self.local_prefix {
            Some(prefix) => path.strip_prefix(prefix.as_str()),
            None => Some(path),
        }
    }

    fn sidecar_path(&self, key: &str) -> String {
        format!("{SIDECAR_ROOT}{}", self.path(key))
    }

    async fn read_sidecar(&self, key: &str) -> Result<ObjectHeaders, ClientError> {
        match self.operator.read(&self.sidecar_path(key)).await {
            Ok(buf) => serde_json::from_slice(&buf.to_vec())
                .map_err(|e| ClientError::provider(format!("corrupt metadata of '{key}': {e}"))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ObjectHeaders::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_sidecar(&self, key: &str, headers: &ObjectHeaders) -> Result<(), ClientError> {
        let path = self.sidecar_path(key);
        if headers.is_empty() {
            return self.operator.delete(&path).await.map_err(ClientError::from);
        }

        let lowered: ObjectHeaders = headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();
        let json = serde_json::to_vec(&lowered)
            .map_err(|e| ClientError::provider(format!("could not encode metadata: {e}")))?;
        self.operator.write(&path, json).await?;
        Ok(())
    }
}

/// Strip [`USER_METADATA_PREFIX`] for OpenDAL, which adds its own.
fn to_user_metadata(headers: ObjectHeaders) -> Vec<(String, String)> {
    headers
        .into_iter()
        .filter_map(|(name, value)| {
            name.to_ascii_lowercase()
                .strip_prefix(USER_METADATA_PREFIX)
                .map(|token| (token.to_string(), value))
        })
        .collect()
}

fn from_user_metadata(meta: &opendal::Metadata) -> ObjectHeaders {
    meta.user_metadata()
        .into_iter()
        .flatten()
        .map(|(name, value)| {
            (
                format!("{USER_METADATA_PREFIX}{}", name.to_ascii_lowercase()),
                value.clone(),
            )
        })
        .collect()
}

/// Drain `body` into `writer` and commit it.
async fn write_body(writer: &mut Writer, mut body: ByteStream) -> Result<u64, ClientError> {
    let mut written = 0u64;
    while let Some(chunk) = body.try_next().await? {
        written += chunk.len() as u64;
        writer.write(chunk).await?;
    }
    writer.close().await?;
    Ok(written)
}

impl ObjectClient for OpendalClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<bool, ClientError> {
        if let Some(prefix) = &self.local_prefix {
            return self.operator.exists(prefix).await.map_err(ClientError::from);
        }
        if let Some(s3) = &self.s3 {
            return s3.bucket_exists().await;
        }

        match self.operator.check().await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_bucket(&self) -> Result<(), ClientError> {
        if let Some(s3) = &self.s3 {
            return s3.create_bucket().await;
        }
        let Some(prefix) = &self.local_prefix else {
            return Err(ClientError::Unsupported(format!(
                "cannot create Azure container '{}'",
                self.bucket
            )));
        };

        if self.operator.exists(prefix).await? {
            return Err(ClientError::AlreadyExists(self.bucket.clone()));
        }
        self.operator.create_dir(prefix).await.map_err(ClientError::from)
    }

    async fn put(
        &self,
        key: &str,
        body: ByteStream,
        headers: ObjectHeaders,
    ) -> Result<u64, ClientError> {
        let path = self.path(key);
        let (metadata, sidecar_headers) = if self.uses_sidecar() {
            (Vec::new(), Some(headers))
        } else {
            (to_user_metadata(headers), None)
        };
        let mut writer = if metadata.is_empty() {
            self.operator.writer(&path).await?
        } else {
            self.operator.writer_with(&path).user_metadata(metadata).await?
        };

        let written = match write_body(&mut writer, body).await {
            Ok(written) => written,
            Err(err) => {
                if let Err(abort) = writer.abort().await {
                    warn!(key, error = %abort, "Could not abort partial upload");
                }
                return Err(err);
            }
        };

        let Some(headers) = sidecar_headers else {
            return Ok(written);
        };
        if let Err(err) = self.write_sidecar(key, &headers).await {
            if let Err(cleanup) = self.operator.delete(&path).await {
                warn!(key, error = %cleanup, "Could not remove object without metadata");
            }
            return Err(err);
        }
        Ok(written)
    }

    async fn get(&self, key: &str) -> Result<ByteStream, ClientError> {
        // Readers are lazy; stat first so a missing key fails here.
        let path = self.path(key);
        self.operator.stat(&path).await?;
        let stream = self
            .operator
            .reader(&path)
            .await?
            .into_bytes_stream(..)
            .await?;
        Ok(stream.boxed())
    }

    async fn head(&self, key: &str) -> Result<ObjectHead, ClientError> {
        let meta = self.operator.stat(&self.path(key)).await?;
        let headers = if self.uses_sidecar() {
            self.read_sidecar(key).await?
        } else {
            from_user_metadata(&meta)
        };
        Ok(ObjectHead {
            content_length: meta.content_length(),
            headers,
            etag: meta.etag().map(str::to_string),
        })
    }

    async fn replace_metadata(
        &self,
        key: &str,
        headers: ObjectHeaders,
        if_match: Option<&str>,
    ) -> Result<(), ClientError> {
        let path = self.path(key);
        if let Some(s3) = &self.s3 {
            let metadata = to_user_metadata(headers).into_iter().collect();
            return s3.replace_metadata(&path, metadata, if_match).await;
        }

        let meta = self.operator.stat(&path).await?;
        if matches!((if_match, meta.etag()), (Some(expected), Some(current)) if expected != current)
        {
            return Err(ClientError::Conflict(format!("'{key}' was replaced")));
        }
        self.write_sidecar(key, &headers).await
    }

    async fn exists(&self, key: &str) -> Result<bool, ClientError> {
        self.operator
            .exists(&self.path(key))
            .await
            .map_err(ClientError::from)
    }

    async fn delete(&self, key: &str) -> Result<(), ClientError> {
        self.operator.delete(&self.path(key)).await?;
        if self.uses_sidecar() {
            self.operator.delete(&self.sidecar_path(key)).await?;
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ClientError> {
        let entries = match self
            .operator
            .list_with(&self.path(prefix))
            .recursive(true)
            .await
        {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.metadata().is_file())
            .filter_map(|entry| self.key(entry.path()).map(str::to_string))
            .filter(|key| key.starts_with(prefix))
            .filter(|key| !(self.uses_sidecar() && key.starts_with(SIDECAR_ROOT)))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Extension trait for pipe operator.
trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> Pipe for T {}
