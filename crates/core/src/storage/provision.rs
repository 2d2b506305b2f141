//! Bucket provisioning.

use tracing::{debug, info};

use super::client::ObjectClient;
use super::error::ClientError;

/// Create the client's bucket unless it already exists.
///
/// Losing a creation race to another writer counts as success.
pub async fn ensure_bucket<C: ObjectClient>(client: &C) -> Result<(), ClientError> {
    if client.bucket_exists().await? {
        debug!(bucket = client.bucket(), "Bucket exists");
        return Ok(());
    }

    match client.create_bucket().await {
        Ok(()) => {
            info!(bucket = client.bucket(), "Created bucket");
            Ok(())
        }
        Err(ClientError::AlreadyExists(_)) => {
            info!(bucket = client.bucket(), "Bucket created concurrently");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ClientFactory, Fault, InMemoryBackend};

    #[tokio::test]
    async fn test_creates_missing_bucket() {
        let backend = InMemoryBackend::new();
        let client = backend.connect("fresh").expect("connect");

        ensure_bucket(&client).await.expect("created");

        assert!(backend.has_bucket("fresh"));
    }

    #[tokio::test]
    async fn test_existing_bucket_is_left_alone() {
        let backend = InMemoryBackend::new().with_bucket("present");
        let client = backend.connect("present").expect("connect");

        ensure_bucket(&client).await.expect("no-op");
        assert!(backend.has_bucket("present"));
    }

    #[tokio::test]
    async fn test_concurrent_creation_is_swallowed() {
        let backend = InMemoryBackend::new();
        let client = backend.connect("raced").expect("connect");

        backend.fail_next(Fault::Skip);
        backend.fail_next(Fault::AlreadyExists);
        ensure_bucket(&client).await.expect("race is not an error");
    }

    #[tokio::test]
    async fn test_other_failures_propagate() {
        let backend = InMemoryBackend::new();
        let client = backend.connect("denied").expect("connect");

        backend.fail_next(Fault::InvalidCredentials);
        let err = ensure_bucket(&client).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidCredentials(_)));
    }
}
