//! S3 connection strings.
//!
//! A connection string is a `;`-separated list of `Name=Value` pairs:
//!
//! ```text
//! AccessKeyId=AKIA...; SecretAccessKey=...; RegionEndpoint=eu-west-1; BucketName=attachments
//! ```
//!
//! `Endpoint=...` may be added for S3-compatible services.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::config::{AttachmentOptions, StorageProvider};
use crate::error::{BusError, BusResult};

/// Environment variable consulted when no connection file exists.
pub const CONNECTION_INFO_ENV: &str = "BUCKETBUS_S3_CONNECTIONINFO";

/// Default connection file name.
pub const CONNECTION_INFO_FILE: &str = "s3_connectioninfo.txt";

/// Parsed S3 connection information.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// AWS access key ID.
    pub access_key_id: String,
    /// AWS secret access key.
    pub secret_access_key: String,
    /// Region name, e.g. `eu-west-1`.
    pub region: String,
    /// Attachment bucket.
    pub bucket_name: String,
    /// Custom endpoint for S3-compatible services.
    pub endpoint: Option<String>,
}

impl ConnectionInfo {
    /// Load connection info from `file` if it exists, else from
    /// [`CONNECTION_INFO_ENV`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if neither source is available or the
    /// text cannot be parsed.
    pub fn load(file: impl AsRef<Path>) -> BusResult<Self> {
        let file = file.as_ref();
        if file.exists() {
            let text = std::fs::read_to_string(file).map_err(|e| {
                BusError::configuration_caused_by(
                    format!("could not read connection info from file {}", file.display()),
                    e,
                )
            })?;
            return text.parse();
        }

        match std::env::var(CONNECTION_INFO_ENV) {
            Ok(text) => text.parse(),
            Err(_) => Err(BusError::configuration("missing S3 connection info")),
        }
    }

    /// Provider configuration for these credentials.
    #[must_use]
    pub fn provider(&self) -> StorageProvider {
        let provider = StorageProvider::s3(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            self.region.clone(),
        );
        match &self.endpoint {
            Some(endpoint) => provider.with_endpoint(endpoint.clone()),
            None => provider,
        }
    }

    /// Attachment options for the configured bucket.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the bucket name is blank.
    pub fn attachment_options(&self) -> BusResult<AttachmentOptions> {
        AttachmentOptions::new(self.bucket_name.clone())
    }
}

impl FromStr for ConnectionInfo {
    type Err = BusError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut pairs = HashMap::new();
        for part in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = part.split_once('=').ok_or_else(|| {
                BusError::configuration(format!(
                    "malformed connection string segment '{part}', expected the form \
                     'AccessKeyId=...; SecretAccessKey=...; RegionEndpoint=...; BucketName=...'"
                ))
            })?;
            pairs.insert(name.trim(), value.trim());
        }

        let take = |name: &str| -> BusResult<String> {
            pairs.get(name).map(|v| (*v).to_string()).ok_or_else(|| {
                let mut found: Vec<&str> = pairs.keys().copied().collect();
                found.sort_unstable();
                BusError::configuration(format!(
                    "could not find key '{name}' - got these keys: {}",
                    found.join(", ")
                ))
            })
        };

        Ok(Self {
            access_key_id: take("AccessKeyId")?,
            secret_access_key: take("SecretAccessKey")?,
            region: take("RegionEndpoint")?,
            bucket_name: take("BucketName")?,
            endpoint: pairs.get("Endpoint").map(|v| (*v).to_string()),
        })
    }
}

impl std::fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("bucket_name", &self.bucket_name)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
