//! Error-to-response mapping for HTTP handlers.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use citizen_core::{RepoError, ServiceError, ServiceErrorKind};
use log::error;
use serde::Serialize;

const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Handler failure rendered as an `application/problem+json` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

#[derive(Serialize)]
struct Problem<'a> {
    title: &'a str,
    status: u16,
    detail: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    /// Logs `cause` and hides it from the caller.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        error!("event=http_request module=api status=error error={}", cause);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        let status = match value.kind() {
            ServiceErrorKind::NotFound => StatusCode::NOT_FOUND,
            ServiceErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ServiceErrorKind::Conflict => StatusCode::CONFLICT,
            ServiceErrorKind::Internal => return Self::internal(value),
        };
        Self::new(status, value.to_string())
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::from(ServiceError::from(value))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem = Problem {
            title: self.status.canonical_reason().unwrap_or("Error"),
            status: self.status.as_u16(),
            detail: &self.detail,
        };
        let body = match serde_json::to_string(&problem) {
            Ok(body) => body,
            Err(_) => return self.status.into_response(),
        };
        (
            self.status,
            [(header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE)],
            body,
        )
            .into_response()
    }
}
