//! Logical attachment ids and their physical object keys.

use bucketbus_shared::AttachmentOptions;

/// An attachment id paired with the object key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentity {
    /// Caller-supplied attachment id.
    pub id: String,
    /// Object key: `prefix + id + suffix`.
    pub key: String,
}

impl ObjectIdentity {
    /// Resolve `id` with the key prefix and suffix from `options`.
    #[must_use]
    pub fn new(id: impl Into<String>, options: &AttachmentOptions) -> Self {
        let id = id.into();
        let key = object_key(
            &id,
            options.object_key_prefix.as_deref(),
            options.object_key_suffix.as_deref(),
        );
        Self { id, key }
    }
}

/// Object key for `id`. Plain concatenation, so distinct ids never share a key.
#[must_use]
pub fn object_key(id: &str, prefix: Option<&str>, suffix: Option<&str>) -> String {
    let prefix = prefix.unwrap_or_default();
    let suffix = suffix.unwrap_or_default();
    format!("{prefix}{id}{suffix}")
}
