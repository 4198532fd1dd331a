use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::ErrorReport;
use crate::infra::error::InfraError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const PROXY_ERROR: &str = "proxy_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            report: None,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            message,
            None,
        )
    }

    pub fn internal(message: &'static str, hint: Option<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::PROXY_ERROR,
            message,
            hint,
        )
    }
}

impl From<InfraError> for ApiError {
    fn from(error: InfraError) -> Self {
        let report = ErrorReport::from_error(
            "infra::http::api",
            StatusCode::INTERNAL_SERVER_ERROR,
            &error,
        );
        let mut api = ApiError::internal("Proxy error", Some(error.to_string()));
        api.report = Some(report);
        api
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let Self {
            status,
            code,
            message,
            hint,
            report,
        } = self;
        // Attach a structured report so the logging middleware can emit rich diagnostics.
        let report = report.unwrap_or_else(|| {
            ErrorReport::from_message(
                "infra::http::api",
                status,
                format!("{}: {}", code, hint.as_deref().unwrap_or(message)),
            )
        });
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: code.to_string(),
                message: message.to_string(),
                hint,
            },
        };
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
