use crate::test_utils::{
    build_service, build_service_with_cache, form_request, get_request, json_body, router_for,
    setup_router, test_settings, test_settings_with_pool,
};
use axum::http::{header, StatusCode};
use backend_lib::auth::{session, RedisSessionCache};
use backend_lib::init::InitState;
use futures_util::future::join_all;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

#[tokio::test]
async fn test_alice_scenario() {
    let (app, _temp_dir) = setup_router();

    let response = app
        .clone()
        .oneshot(form_request("/register", "alice", "s3cret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["username"], "alice");

    let response = app
        .clone()
        .oneshot(form_request("/token", "alice", "s3cret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get_request("/users/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["username"], "alice");

    let response = app
        .oneshot(form_request("/register", "alice", "other"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"]["code"], "CONFLICT_001");
}

#[tokio::test]
async fn test_empty_fields_are_bad_request() {
    let (app, _temp_dir) = setup_router();

    let response = app
        .clone()
        .oneshot(form_request("/register", "", "s3cret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(form_request("/register", "alice", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (app, _temp_dir) = setup_router();
    app.clone()
        .oneshot(form_request("/register", "alice", "s3cret"))
        .await
        .unwrap();

    let wrong_password = app
        .clone()
        .oneshot(form_request("/token", "alice", "wrong"))
        .await
        .unwrap();
    let unknown_user = app
        .oneshot(form_request("/token", "mallory", "s3cret"))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        wrong_password.headers().get(header::WWW_AUTHENTICATE),
        unknown_user.headers().get(header::WWW_AUTHENTICATE)
    );
    assert_eq!(json_body(wrong_password).await, json_body(unknown_user).await);
}

#[tokio::test]
async fn test_users_me_rejects_bad_tokens() {
    let (app, _temp_dir) = setup_router();

    let response = app
        .clone()
        .oneshot(get_request("/users/me", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");

    let response = app
        .oneshot(get_request("/users/me", Some("not.a.token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_duplicate_registration() {
    let temp_dir = TempDir::new().unwrap();
    let settings = test_settings_with_pool(temp_dir.path(), 10);
    let app = router_for(build_service(&settings), settings);

    let requests: Vec<_> = (0..16)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                app.oneshot(form_request("/register", "bob", &format!("password-{i}")))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();
    let statuses: Vec<StatusCode> = join_all(requests)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let created = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let conflicts = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(created, 1, "statuses: {statuses:?}");
    assert_eq!(conflicts, 15, "statuses: {statuses:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_cold_start_burst_initializes_once() {
    let temp_dir = TempDir::new().unwrap();
    let settings = test_settings_with_pool(temp_dir.path(), 10);
    let service = build_service(&settings);
    let app = router_for(service.clone(), settings);
    assert_eq!(service.init_state(), InitState::Uninitialized);

    let requests: Vec<_> = (0..16)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                app.oneshot(form_request("/register", &format!("user-{i}"), "s3cret"))
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();
    let statuses: Vec<StatusCode> = join_all(requests)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert!(statuses.iter().all(|s| *s == StatusCode::OK), "statuses: {statuses:?}");
    assert_eq!(service.init_attempts(), 1);
    assert_eq!(service.init_state(), InitState::Ready);
}

#[tokio::test]
async fn test_unreachable_cache_does_not_fail_login() {
    let temp_dir = TempDir::new().unwrap();
    let settings = test_settings(temp_dir.path());
    // Nothing listens on port 1
    let cache = Arc::new(RedisSessionCache::new("redis://127.0.0.1:1").unwrap());
    let app = router_for(build_service_with_cache(&settings, cache), settings);

    let response = app
        .clone()
        .oneshot(form_request("/register", "alice", "s3cret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(form_request("/token", "alice", "s3cret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unreachable_store_is_service_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = test_settings(temp_dir.path());
    // A directory that does not exist cannot hold the database file
    settings.database.url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("missing").join("accounts.db").display()
    );
    settings.database.acquire_timeout_secs = 1;
    let service = build_service_with_cache(
        &settings,
        session::from_settings(&settings.cache).unwrap(),
    );
    let app = router_for(service.clone(), settings);

    let response = app
        .clone()
        .oneshot(form_request("/register", "alice", "s3cret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "SVC_001");
    assert!(!body["error"]["message"].as_str().unwrap().contains("sqlite"));
    assert_eq!(service.init_state(), InitState::Uninitialized);

    let response = app.oneshot(get_request("/ready", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_probes() {
    let (app, _temp_dir) = setup_router();

    let response = app.clone().oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");

    let response = app.clone().oneshot(get_request("/ready", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get_request("/hello", None)).await.unwrap();
    assert_eq!(json_body(response).await["hello"], "world");

    let response = app.oneshot(get_request("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
