//! Configuration for the object store connection and both stores.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BusError, BusResult};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Object store provider and credentials.
    pub storage: StorageProvider,
    /// Attachment (data bus) store options.
    pub attachments: AttachmentOptions,
    /// Subscription index store options.
    #[serde(default)]
    pub subscriptions: SubscriptionOptions,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> BusResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("BUCKETBUS").separator("__"))
            .build()
            .map_err(|e| BusError::configuration_caused_by("could not load configuration", e))?;

        let app: Self = config
            .try_deserialize()
            .map_err(|e| BusError::configuration_caused_by("malformed configuration", e))?;
        app.attachments.validate()?;
        app.subscriptions.validate()?;
        Ok(app)
    }
}

/// Object store provider configuration.
///
/// Buckets are not part of the provider: each store names its own bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: AWS S3, Cloudflare R2, MinIO
    S3 {
        /// Custom endpoint URL (AWS default when absent).
        #[serde(default)]
        endpoint: Option<String>,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Custom endpoint URL.
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// Local filesystem (development only), one sub-directory per bucket
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageProvider {
    /// Create S3-compatible provider.
    #[must_use]
    pub fn s3(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: None,
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create Azure Blob Storage provider.
    #[must_use]
    pub fn azure_blob(account: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self::AzureBlob {
            account: account.into(),
            access_key: access_key.into(),
            endpoint: None,
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Set a custom endpoint. Ignored for the local filesystem.
    #[must_use]
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        match &mut self {
            Self::S3 { endpoint, .. } | Self::AzureBlob { endpoint, .. } => {
                *endpoint = Some(url.into());
            }
            Self::LocalFs { .. } => {}
        }
        self
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
        }
    }
}

/// Options for the attachment store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentOptions {
    /// Name of bucket used to store attachments.
    pub bucket_name: String,
    /// Optional prefix for object keys.
    #[serde(default)]
    pub object_key_prefix: Option<String>,
    /// Optional suffix for object keys.
    #[serde(default)]
    pub object_key_suffix: Option<String>,
    /// Reserved character separating key and value of packed metadata.
    #[serde(default = "default_delimiter")]
    pub metadata_delimiter: char,
    /// Extra metadata keys stored under their own header.
    #[serde(default)]
    pub known_metadata_keys: BTreeSet<String>,
    /// Skip stamping the read time on every read. Saves two requests per read.
    #[serde(default)]
    pub do_not_update_last_read_time: bool,
    /// Create the bucket on startup when missing.
    #[serde(default = "default_true")]
    pub auto_create_bucket: bool,
}

fn default_delimiter() -> char {
    AttachmentOptions::DEFAULT_DELIMITER
}

fn default_true() -> bool {
    true
}

impl AttachmentOptions {
    /// Default metadata delimiter.
    pub const DEFAULT_DELIMITER: char = '=';

    /// Create options for the given bucket with defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the bucket name is blank.
    pub fn new(bucket_name: impl Into<String>) -> BusResult<Self> {
        let options = Self {
            bucket_name: bucket_name.into(),
            object_key_prefix: None,
            object_key_suffix: None,
            metadata_delimiter: Self::DEFAULT_DELIMITER,
            known_metadata_keys: BTreeSet::new(),
            do_not_update_last_read_time: false,
            auto_create_bucket: true,
        };
        options.validate()?;
        Ok(options)
    }

    /// Check invariants that deserialization cannot express.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the bucket name is blank or the
    /// delimiter is not a printable ASCII character, which header values
    /// require.
    pub fn validate(&self) -> BusResult<()> {
        if self.bucket_name.trim().is_empty() {
            return Err(BusError::configuration("attachment bucket name cannot be empty"));
        }
        if !self.metadata_delimiter.is_ascii_graphic() {
            return Err(BusError::configuration(format!(
                "metadata delimiter {:?} must be a printable ASCII character",
                self.metadata_delimiter
            )));
        }
        Ok(())
    }

    /// Set the object key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.object_key_prefix = Some(prefix.into());
        self
    }

    /// Set the object key suffix.
    #[must_use]
    pub fn with_key_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.object_key_suffix = Some(suffix.into());
        self
    }

    /// Set the metadata delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.metadata_delimiter = delimiter;
        self
    }

    /// Register additional known metadata keys.
    #[must_use]
    pub fn with_known_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_metadata_keys
            .extend(keys.into_iter().map(Into::into));
        self
    }

    /// Disable the read-time update on reads.
    #[must_use]
    pub fn without_read_time_update(mut self) -> Self {
        self.do_not_update_last_read_time = true;
        self
    }

    /// Enable or disable bucket auto-creation.
    #[must_use]
    pub fn with_auto_create_bucket(mut self, enabled: bool) -> Self {
        self.auto_create_bucket = enabled;
        self
    }
}

/// Options for the subscription index store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionOptions {
    /// Name of the bucket holding the index.
    #[serde(default = "default_subscriptions_bucket")]
    pub bucket_name: String,
    /// Create the bucket when missing.
    #[serde(default = "default_true")]
    pub auto_create_bucket: bool,
}

fn default_subscriptions_bucket() -> String {
    SubscriptionOptions::DEFAULT_BUCKET.to_string()
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            bucket_name: default_subscriptions_bucket(),
            auto_create_bucket: true,
        }
    }
}

impl SubscriptionOptions {
    /// Default index bucket.
    pub const DEFAULT_BUCKET: &'static str = "bucketbus-subscriptions";

    /// Use a different bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket_name: impl Into<String>) -> Self {
        self.bucket_name = bucket_name.into();
        self
    }

    /// Enable or disable bucket auto-creation.
    #[must_use]
    pub fn with_auto_create_bucket(mut self, enabled: bool) -> Self {
        self.auto_create_bucket = enabled;
        self
    }

    /// Check invariants that deserialization cannot express.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the bucket name is blank.
    pub fn validate(&self) -> BusResult<()> {
        if self.bucket_name.trim().is_empty() {
            return Err(BusError::configuration(
                "subscription bucket name cannot be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
