mod common {
    pub mod test_backend;
}

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::test_backend::TestBackend;
use courier_backend::{Backend, BackendError, CacheBackend, DeleteStatus, counter};
use courier_core::{CacheKey, CacheValue, Raw, Response};
use http::{HeaderValue, StatusCode, header};

fn response() -> Response {
    Response::new(StatusCode::OK)
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))
        .with_body("hello")
}

#[tokio::test]
async fn typed_set_then_get_restores_response() {
    let backend = TestBackend::new();
    let key = CacheKey::new("response");

    let value = CacheValue::with_ttl(response(), Some(Duration::from_secs(60)));
    backend.set(&key, &value).await.unwrap();

    let cached = backend.get::<Response>(&key).await.unwrap().unwrap();
    assert_eq!(cached.data(), &response());
    assert_eq!(cached.expire(), value.expire());
}

#[tokio::test]
async fn get_missing_is_none() {
    let backend = TestBackend::new();
    let cached = backend
        .get::<Response>(&CacheKey::new("nope"))
        .await
        .unwrap();
    assert!(cached.is_none());
}

#[tokio::test]
async fn undecodable_entry_is_a_format_error() {
    let backend = TestBackend::new();
    let key = CacheKey::new("garbage");
    backend
        .write(&key, CacheValue::new(Raw::from_static(b"\x00\x01"), None))
        .await
        .unwrap();

    let error = backend.get::<Response>(&key).await.unwrap_err();
    assert!(matches!(error, BackendError::FormatError(_)));
}

#[tokio::test]
async fn expired_entries_are_not_returned() {
    let backend = TestBackend::new();
    let key = CacheKey::new("old");
    let expired = CacheValue::new(response(), Some(Utc::now() - chrono::Duration::seconds(1)));
    backend.set(&key, &expired).await.unwrap();

    assert!(backend.get::<Response>(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn default_increment_counts_from_zero() {
    let backend = TestBackend::new();
    let key = CacheKey::new("abc").with_prefix("x-cache-hits");

    assert_eq!(backend.increment(&key).await.unwrap(), 1);
    assert_eq!(backend.increment(&key).await.unwrap(), 2);

    backend.set_counter(&key, 0, None).await.unwrap();
    assert_eq!(backend.increment(&key).await.unwrap(), 1);

    let raw = backend.get_raw(&key).unwrap();
    assert_eq!(counter::decode(raw.data()).unwrap(), 1);
}

#[tokio::test]
async fn counter_keeps_expiry_across_increments() {
    let backend = TestBackend::new();
    let key = CacheKey::new("abc").with_prefix("x-cache-hits");
    let expire = Some(Utc::now() + chrono::Duration::seconds(60));

    backend.set_counter(&key, 0, expire).await.unwrap();
    assert_eq!(backend.increment(&key).await.unwrap(), 1);

    let raw = backend.get_raw(&key).unwrap();
    assert_eq!(counter::decode(raw.data()).unwrap(), 1);
    assert_eq!(raw.expire(), expire);
}

#[tokio::test]
async fn delete_reports_status() {
    let backend = TestBackend::new();
    let key = CacheKey::new("k");
    backend.set_counter(&key, 3, None).await.unwrap();

    assert_eq!(
        backend.delete(&key).await.unwrap(),
        DeleteStatus::Deleted(1)
    );
    assert_eq!(backend.delete(&key).await.unwrap(), DeleteStatus::Missing);
    assert!(!backend.has(&key));
}

#[tokio::test]
async fn clear_through_trait_object() {
    let backend = TestBackend::new();
    backend
        .set_counter(&CacheKey::new("a"), 1, None)
        .await
        .unwrap();
    backend
        .set_counter(&CacheKey::new("b"), 2, None)
        .await
        .unwrap();

    let erased: Arc<dyn Backend + Send + 'static> = Arc::new(backend.clone());
    erased.clear().await.unwrap();

    assert_eq!(backend.len(), 0);
}
