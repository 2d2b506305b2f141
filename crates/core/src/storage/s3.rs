//! S3 requests OpenDAL does not offer.
//!
//! OpenDAL moves payloads but can neither create buckets nor copy an object
//! onto itself with new metadata. [`S3Control`] sends those requests through
//! the AWS SDK with the same credentials and endpoint.

use std::collections::HashMap;
use std::fmt;

use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, MetadataDirective};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use super::error::ClientError;

/// Key characters escaped in `x-amz-copy-source`. `/` separates path segments.
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Region that rejects an explicit location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Bucket-level and metadata requests against one S3 bucket.
#[derive(Clone)]
pub(crate) struct S3Control {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Control {
    pub(crate) fn new(
        access_key_id: &str,
        secret_access_key: &str,
        region: &str,
        endpoint: Option<&str>,
        bucket: &str,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "bucketbus",
        );
        let mut config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials);
        // Custom endpoints are addressed path-style, as OpenDAL does.
        if let Some(endpoint) = endpoint {
            config = config.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(config.build()),
            bucket: bucket.to_string(),
            region: region.to_string(),
        }
    }

    pub(crate) async fn bucket_exists(&self) -> Result<bool, ClientError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => match classify(err) {
                ClientError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    pub(crate) async fn create_bucket(&self) -> Result<(), ClientError> {
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        request.send().await.map(|_| ()).map_err(classify)
    }

    /// Copy `key` onto itself, replacing its user metadata.
    ///
    /// `metadata` names carry no `x-amz-meta-` prefix.
    pub(crate) async fn replace_metadata(
        &self,
        key: &str,
        metadata: HashMap<String, String>,
        if_match: Option<&str>,
    ) -> Result<(), ClientError> {
        let source = format!("{}/{}", self.bucket, utf8_percent_encode(key, COPY_SOURCE));

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .key(key)
            .copy_source(source)
            .metadata_directive(MetadataDirective::Replace)
            .set_metadata(Some(metadata))
            .set_copy_source_if_match(if_match.map(str::to_string))
            .send()
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

impl fmt::Debug for S3Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Control")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Classify an SDK failure by S3 error code, falling back to HTTP status.
fn classify<E>(err: SdkError<E>) -> ClientError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let code = err
        .as_service_error()
        .and_then(ProvideErrorMetadata::code)
        .map(str::to_string);
    let status = err.raw_response().map(|response| response.status().as_u16());
    let message = DisplayErrorContext(&err).to_string();

    match (code.as_deref(), status) {
        (Some("BucketAlreadyOwnedByYou" | "BucketAlreadyExists"), _) => {
            ClientError::AlreadyExists(message)
        }
        (Some("InvalidAccessKeyId" | "SignatureDoesNotMatch" | "AccessDenied"), _)
        | (_, Some(403)) => ClientError::InvalidCredentials(message),
        (Some("PreconditionFailed"), _) | (_, Some(412)) => ClientError::Conflict(message),
        (Some("NoSuchBucket" | "NoSuchKey" | "NotFound"), _) | (_, Some(404)) => {
            ClientError::NotFound(message)
        }
        _ => ClientError::Provider(message),
    }
}
