use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::application::{error::ErrorReport, oauth::TokenExchange, proxy::ProxyOutcome};

use super::AppState;
use super::error::ApiError;

pub async fn root_info() -> impl IntoResponse {
    Json(json!({
        "message": "Reddit OAuth backend",
        "status": "running",
        "endpoints": {
            "GET /": "This info",
            "GET /health": "Health check",
            "GET /api/config": "Get client configuration",
            "POST /oauth/token": "Exchange OAuth code for token",
            "GET /api/cache": "List cached posts",
            "POST /api/cache/import": "Bulk import cached posts",
            "GET /api/reddit/{path}": "Proxy Reddit API calls",
        },
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

pub async fn client_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "token": state.public.token,
        "backend_url": state.public.backend_url,
    }))
}

pub async fn exchange_token(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let Some(code) = body
        .get("code")
        .and_then(Value::as_str)
        .filter(|code| !code.is_empty())
    else {
        return Err(ApiError::bad_request(
            "Authorization code is required",
            None,
        ));
    };
    let redirect_uri = body.get("redirect_uri").and_then(Value::as_str);

    let exchange = state
        .tokens
        .exchange(code, redirect_uri)
        .await
        .map_err(|err| ApiError::internal("Token exchange failed", Some(err.to_string())))?;

    match exchange {
        TokenExchange::Granted(grant) => Ok(Json(grant).into_response()),
        TokenExchange::Refused { details } => {
            let mut response = (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Token exchange failed",
                    "details": details,
                })),
            )
                .into_response();
            ErrorReport::from_message(
                "infra::http::exchange_token",
                StatusCode::BAD_REQUEST,
                "upstream refused token exchange",
            )
            .attach(&mut response);
            Ok(response)
        }
    }
}

pub async fn list_cache(State(state): State<AppState>) -> impl IntoResponse {
    let posts = state.cache.summarize().await;
    let count = posts.len();
    Json(json!({
        "posts": posts,
        "count": count,
    }))
}

pub async fn import_cache(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(posts) = body.get("posts").and_then(Value::as_array) else {
        return Err(ApiError::bad_request(
            "posts array is required",
            Some("expected body shape {\"posts\": [{path, data, timestamp?}]}".to_string()),
        ));
    };

    let imported = state.cache.bulk_import(posts).await;
    Ok(Json(json!({
        "success": true,
        "imported": imported,
        "message": format!("Imported {imported} posts"),
    })))
}

pub async fn proxy_reddit(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Some(authorization) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    else {
        return Err(ApiError::unauthorized("Authorization header required"));
    };

    let outcome = state.proxy.fetch(&path, authorization).await?;

    match outcome {
        ProxyOutcome::Payload(payload) => Ok(Json(payload).into_response()),
        ProxyOutcome::UpstreamError { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = (status, Json(body)).into_response();
            ErrorReport::from_message(
                "infra::http::proxy_reddit",
                status,
                format!("upstream error relayed for `{path}`"),
            )
            .attach(&mut response);
            Ok(response)
        }
    }
}
