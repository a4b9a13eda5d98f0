use crate::test_utils::{build_service, build_service_with_cache, test_settings};
use backend_lib::auth::{AuthService, LoginError, MemorySessionCache, RegisterError, SessionCache};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_auth_service_flow() {
    let temp_dir = TempDir::new().unwrap();
    let settings = test_settings(temp_dir.path());
    let cache = MemorySessionCache::new();
    let service = build_service_with_cache(&settings, Arc::new(cache.clone()));

    let identity = service.register("alice", "s3cret").await.unwrap();
    assert_eq!(identity.username, "alice");

    let first = service.login("alice", "s3cret").await.unwrap();
    assert_eq!(service.authenticate(&first).await.unwrap().id, identity.id);

    // Every login issues a token; the cache keeps the latest one
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let second = service.login("alice", "s3cret").await.unwrap();
    assert_ne!(first, second);

    // The cache write runs after login returns
    let mut latest = None;
    for _ in 0..50 {
        latest = cache.get("alice").await;
        if latest.as_deref() == Some(second.as_str()) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(latest, Some(second));
}

#[tokio::test]
async fn test_registration_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let settings = test_settings(temp_dir.path());

    build_service(&settings)
        .register("alice", "s3cret")
        .await
        .unwrap();

    // A fresh service over the same database runs its own init and sees the row
    let restarted = build_service(&settings);
    assert!(restarted.login("alice", "s3cret").await.is_ok());
    assert_eq!(
        restarted.register("alice", "s3cret").await.unwrap_err(),
        RegisterError::UsernameTaken("alice".to_string())
    );
    assert_eq!(restarted.init_attempts(), 1);
}

#[tokio::test]
async fn test_usernames_are_case_sensitive() {
    let temp_dir = TempDir::new().unwrap();
    let service = build_service(&test_settings(temp_dir.path()));

    service.register("alice", "lower").await.unwrap();
    service.register("Alice", "upper").await.unwrap();

    assert!(service.login("Alice", "upper").await.is_ok());
    assert_eq!(
        service.login("Alice", "lower").await.unwrap_err(),
        LoginError::InvalidCredentials
    );
}
