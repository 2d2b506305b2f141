use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tokio::io::AsyncReadExt;

use super::*;
use crate::clock::FixedClock;
use crate::storage::{Fault, InMemoryBackend};

const BUCKET: &str = "attachments";

fn saved_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid time")
}

async fn store_with(
    options: AttachmentOptions,
) -> (InMemoryBackend, Arc<FixedClock>, AttachmentStore<InMemoryBackend, Arc<FixedClock>>) {
    let backend = InMemoryBackend::new();
    let clock = Arc::new(FixedClock::new(saved_at()));
    let store = AttachmentStore::with_clock(backend.clone(), options, Arc::clone(&clock))
        .await
        .expect("store");
    (backend, clock, store)
}

async fn store() -> (InMemoryBackend, Arc<FixedClock>, AttachmentStore<InMemoryBackend, Arc<FixedClock>>) {
    store_with(AttachmentOptions::new(BUCKET).expect("valid bucket")).await
}

async fn read_all(store: &AttachmentStore<InMemoryBackend, Arc<FixedClock>>, id: &str) -> Vec<u8> {
    let mut reader = store.read(id).await.expect("read");
    let mut data = Vec::new();
    reader.read_to_end(&mut data).await.expect("read to end");
    data
}

#[tokio::test]
async fn test_new_provisions_bucket() {
    let (backend, _, _) = store().await;
    assert!(backend.has_bucket(BUCKET));
}

#[tokio::test]
async fn test_new_without_auto_create_leaves_bucket_missing() {
    let options = AttachmentOptions::new(BUCKET)
        .expect("valid bucket")
        .with_auto_create_bucket(false);
    let (backend, _, store) = store_with(options).await;

    assert!(!backend.has_bucket(BUCKET));
    let err = store.read_metadata("x").await.unwrap_err();
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_new_rejects_colliding_known_keys() {
    let options = AttachmentOptions::new(BUCKET)
        .expect("valid bucket")
        .with_known_keys(["Same Key", "same key"]);
    let err = AttachmentStore::new(InMemoryBackend::new(), options)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_save_stamps_save_time_and_keys_object() {
    let options = AttachmentOptions::new(BUCKET)
        .expect("valid bucket")
        .with_key_prefix("data/")
        .with_key_suffix(".bin");
    let (backend, _, store) = store_with(options).await;

    store.save("abc", &b"payload"[..], None).await.expect("save");

    assert_eq!(backend.keys(BUCKET), vec!["data/abc.bin"]);
    let headers = backend.headers(BUCKET, "data/abc.bin").expect("stored");
    assert_eq!(
        headers.get("x-amz-meta-databus-savetime").map(String::as_str),
        Some("2026-03-01T09:00:00Z")
    );
}

#[tokio::test]
async fn test_save_overrides_caller_save_time() {
    let (_, _, store) = store().await;
    let metadata = HashMap::from([(keys::SAVE_TIME.to_string(), "yesterday".to_string())]);

    store.save("abc", &b""[..], Some(metadata)).await.expect("save");

    let stored = store.read_metadata("abc").await.expect("metadata");
    assert_eq!(stored[keys::SAVE_TIME], "2026-03-01T09:00:00Z");
}

#[tokio::test]
async fn test_save_does_not_store_caller_length() {
    let (backend, _, store) = store().await;
    let metadata = HashMap::from([(keys::LENGTH.to_string(), "999".to_string())]);

    store.save("abc", &b"12"[..], Some(metadata)).await.expect("save");

    let headers = backend.headers(BUCKET, "abc").expect("stored");
    assert!(!headers.contains_key("x-amz-meta-databus-length"));
    assert!(!headers.values().any(|value| value.contains("999")));
    let stored = store.read_metadata("abc").await.expect("metadata");
    assert_eq!(stored[keys::LENGTH], "2");
}

#[tokio::test]
async fn test_read_stamps_read_time() {
    let (backend, clock, store) = store().await;
    let metadata = HashMap::from([("Sender".to_string(), "queue@host".to_string())]);
    store
        .save("abc", &b"payload"[..], Some(metadata))
        .await
        .expect("save");

    let later = Utc.with_ymd_and_hms(2026, 3, 2, 10, 30, 0).single().expect("valid time");
    clock.set(later);
    assert_eq!(read_all(&store, "abc").await, b"payload");

    let stored = store.read_metadata("abc").await.expect("metadata");
    assert_eq!(stored[keys::READ_TIME], "2026-03-02T10:30:00Z");
    assert_eq!(stored[keys::SAVE_TIME], "2026-03-01T09:00:00Z");
    assert_eq!(stored["Sender"], "queue@host");

    let headers = backend.headers(BUCKET, "abc").expect("stored");
    assert!(headers.contains_key("x-amz-meta-databus-readtime"));
}

#[tokio::test]
async fn test_read_without_read_time_update() {
    let options = AttachmentOptions::new(BUCKET)
        .expect("valid bucket")
        .without_read_time_update();
    let (_, _, store) = store_with(options).await;
    store.save("abc", &b"payload"[..], None).await.expect("save");

    assert_eq!(read_all(&store, "abc").await, b"payload");

    let stored = store.read_metadata("abc").await.expect("metadata");
    assert!(!stored.contains_key(keys::READ_TIME));
}

#[tokio::test]
async fn test_read_metadata_reports_length_without_storing_it() {
    let (backend, _, store) = store().await;
    store.save("abc", &b"12345"[..], None).await.expect("save");

    let stored = store.read_metadata("abc").await.expect("metadata");
    assert_eq!(stored[keys::LENGTH], "5");

    let headers = backend.headers(BUCKET, "abc").expect("stored");
    assert!(!headers.contains_key("x-amz-meta-databus-length"));
}

#[tokio::test]
async fn test_read_metadata_does_not_stamp_read_time() {
    let (_, _, store) = store().await;
    store.save("abc", &b""[..], None).await.expect("save");

    store.read_metadata("abc").await.expect("metadata");
    let stored = store.read_metadata("abc").await.expect("metadata");
    assert!(!stored.contains_key(keys::READ_TIME));
}

#[tokio::test]
async fn test_read_time_failure_aborts_read() {
    let (backend, _, store) = store().await;
    store.save("abc", &b"payload"[..], None).await.expect("save");

    backend.fail_next(Fault::Skip);
    backend.fail_next(Fault::Provider("copy failed".to_string()));
    let err = store.read("abc").await.err().expect("read should fail");
    assert_eq!(err.error_code(), "APPLICATION_ERROR");
    assert!(err.to_string().starts_with("could not update read time of attachment 'abc'"));
}

#[tokio::test]
async fn test_read_skips_stamp_when_object_was_replaced() {
    let (backend, _, store) = store().await;
    store.save("abc", &b"payload"[..], None).await.expect("save");

    backend.fail_next(Fault::Skip);
    backend.fail_next(Fault::Conflict);
    assert_eq!(read_all(&store, "abc").await, b"payload");

    let stored = store.read_metadata("abc").await.expect("metadata");
    assert!(!stored.contains_key(keys::READ_TIME));
}
