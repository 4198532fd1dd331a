pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::{cache::CacheService, oauth::TokenService, proxy::ProxyService};

use middleware::{log_responses, set_request_context};

/// Non-secret values surfaced to the browser via `GET /api/config`.
#[derive(Debug, Clone)]
pub struct PublicConfig {
    pub token: Option<String>,
    pub backend_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub cache: CacheService,
    pub proxy: ProxyService,
    pub tokens: TokenService,
    pub public: Arc<PublicConfig>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root_info))
        .route("/health", get(handlers::health))
        .route("/api/config", get(handlers::client_config))
        .route("/oauth/token", post(handlers::exchange_token))
        .route("/api/cache", get(handlers::list_cache))
        .route("/api/cache/import", post(handlers::import_cache))
        .route("/api/reddit/{*path}", get(handlers::proxy_reddit))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
