//! Endpoint coverage for the cache and proxy surfaces, driven through the
//! real router with `tower::ServiceExt::oneshot`. Upstream calls are never
//! exercised here: the configured API base is unroutable, so any test that
//! passes did so without leaving the process.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use snooproxy::application::{cache::CacheService, oauth::TokenService, proxy::ProxyService};
use snooproxy::config::RedditSettings;
use snooproxy::infra::http::middleware::RequestContext;
use snooproxy::infra::http::{AppState, PublicConfig, build_router};
use snooproxy::infra::reddit::RedditClient;
use snooproxy::infra::store::RecordStore;

fn test_settings() -> RedditSettings {
    RedditSettings {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        redirect_uri: "http://localhost:8000/auth.html".to_string(),
        user_agent: "snooproxy-tests".to_string(),
        // Unroutable: any accidental upstream call fails fast.
        api_base_url: "http://127.0.0.1:1".to_string(),
        token_url: "http://127.0.0.1:1/token".to_string(),
        access_token: Some("seeded-token".to_string()),
    }
}

fn test_app(dir: &tempfile::TempDir) -> (AppState, Router) {
    let store = Arc::new(RecordStore::new(dir.path().join("cache")).expect("store init"));
    let reddit = Arc::new(RedditClient::new(test_settings()).expect("client init"));

    let cache = CacheService::new(store);
    let state = AppState {
        proxy: ProxyService::new(cache.clone(), reddit.clone()),
        tokens: TokenService::new(reddit),
        cache,
        public: Arc::new(PublicConfig {
            token: Some("seeded-token".to_string()),
            backend_url: "http://localhost:3001".to_string(),
        }),
    };
    let router = build_router(state.clone());
    (state, router)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize")))
        .expect("request")
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (_state, router) = test_app(&dir);

    let response = router.oneshot(get("/health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().expect("timestamp").ends_with('Z'));
}

#[tokio::test]
async fn config_exposes_token_and_backend_url() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (_state, router) = test_app(&dir);

    let response = router.oneshot(get("/api/config")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["token"], "seeded-token");
    assert_eq!(body["backend_url"], "http://localhost:3001");
}

#[tokio::test]
async fn proxy_without_credential_is_rejected_before_any_fetch() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (_state, router) = test_app(&dir);

    let response = router
        .oneshot(get("/api/reddit/r/rust/top.json"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "unauthorized");

    // No cache record may exist after a rejected request.
    assert!(
        std::fs::read_dir(dir.path().join("cache"))
            .expect("cache dir")
            .next()
            .is_none()
    );
}

#[tokio::test]
async fn proxy_serves_cached_payload_without_upstream() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (state, router) = test_app(&dir);

    let payload = json!({"kind": "Listing", "data": {"children": []}});
    state.cache.store("r/rust/top.json", &payload).await;

    let request = Request::builder()
        .uri("/api/reddit/r/rust/top.json")
        .header(header::AUTHORIZATION, "Bearer user-token")
        .body(Body::empty())
        .expect("request");

    // The upstream base is unroutable, so a 200 proves the cache answered.
    let response = router.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, payload);
}

#[tokio::test]
async fn import_then_list_returns_newest_first() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (_state, router) = test_app(&dir);

    let import = json!({
        "posts": [
            {
                "path": "r/rust/comments/old",
                "data": [{"data": {"children": [{"data": {
                    "title": "older post", "subreddit": "rust", "author": "alice"
                }}]}}],
                "timestamp": "2024-01-01T00:00:00.000Z"
            },
            {
                "path": "r/rust/comments/new",
                "data": [{"data": {"children": [{"data": {
                    "title": "newer post", "subreddit": "rust", "author": "bob"
                }}]}}],
                "timestamp": "2025-01-01T00:00:00.000Z"
            },
            {"path": "r/bad"}
        ]
    });

    let response = router
        .clone()
        .oneshot(post_json("/api/cache/import", &import))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["imported"], 2);

    let response = router.oneshot(get("/api/cache")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["count"], 2);
    let posts = body["posts"].as_array().expect("posts array");
    assert_eq!(posts[0]["path"], "r/rust/comments/new");
    assert_eq!(posts[0]["title"], "newer post");
    assert_eq!(posts[1]["path"], "r/rust/comments/old");
    assert_eq!(posts[1]["author"], "alice");
}

#[tokio::test]
async fn import_without_posts_array_is_a_client_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (_state, router) = test_app(&dir);

    let response = router
        .clone()
        .oneshot(post_json("/api/cache/import", &json!({"posts": "nope"})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(post_json("/api/cache/import", &json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn token_exchange_requires_a_code() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (_state, router) = test_app(&dir);

    let response = router
        .oneshot(post_json("/oauth/token", &json!({"redirect_uri": "x"})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Authorization code is required");
}

#[tokio::test]
async fn each_response_carries_a_distinct_uuid_request_id() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (_state, router) = test_app(&dir);

    let first = router
        .clone()
        .oneshot(get("/health"))
        .await
        .expect("response");
    let second = router.oneshot(get("/health")).await.expect("response");

    let first_id = first
        .extensions()
        .get::<RequestContext>()
        .expect("request context")
        .request_id
        .clone();
    let second_id = second
        .extensions()
        .get::<RequestContext>()
        .expect("request context")
        .request_id
        .clone();

    uuid::Uuid::parse_str(&first_id).expect("uuid request id");
    uuid::Uuid::parse_str(&second_id).expect("uuid request id");
    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn empty_cache_lists_zero_posts() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (_state, router) = test_app(&dir);

    let response = router.oneshot(get("/api/cache")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["posts"], json!([]));
}
