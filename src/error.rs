// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Closed error taxonomy for the relay.
//!
//! Every failure in the service is classified exactly once, at the point of
//! detection, into one of the [`ErrorKind`] variants. The transport status
//! code is a pure function of the kind, and every error serializes to the
//! same wire shape:
//!
//! ```json
//! { "success": false, "message": "...", "code": "...", "details": ... }
//! ```
//!
//! Clients must branch on `code`, which is stable; `message` is
//! human-readable and may change between versions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Closed set of error classifications.
///
/// Adding a variant requires adding it to both [`ErrorKind::status`] and
/// [`ErrorKind::code`]; no status code is ever inferred ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input field.
    Validation,
    /// Generic malformed request.
    BadRequest,
    /// Missing or invalid credentials.
    Authentication,
    /// Credentials valid, action forbidden.
    Authorization,
    /// Entity absent (route or upstream resource).
    ResourceNotFound,
    /// Conflicting state.
    ResourceConflict,
    /// Local or upstream throttling triggered.
    RateLimit,
    /// Upstream returned an unexpected error or no response.
    ExternalApi,
    /// Upstream explicitly signaled unavailability.
    ServiceUnavailable,
    /// Local defect or unclassified failure.
    InternalServer,
}

impl ErrorKind {
    /// Transport status for this kind. Pure function, no exceptions.
    pub fn status(self) -> StatusCode {
        match self {
            Self::Validation | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::ResourceNotFound => StatusCode::NOT_FOUND,
            Self::ResourceConflict => StatusCode::CONFLICT,
            Self::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            Self::ExternalApi => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalServer => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable wire identifier for client-side branching.
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST_ERROR",
            Self::Authentication => "AUTHENTICATION_ERROR",
            Self::Authorization => "AUTHORIZATION_ERROR",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::ResourceConflict => "RESOURCE_CONFLICT",
            Self::RateLimit => "RATE_LIMIT_ERROR",
            Self::ExternalApi => "EXTERNAL_API_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InternalServer => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// A classified error, ready to serialize as a wire response.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    /// Raw upstream payload or transport message, for diagnostics only.
    pub details: Option<Value>,
    /// Seconds until a throttled client may retry. Only set for rate limits.
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            retry_after_secs: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceNotFound, format!("{} not found", resource.into()))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceConflict, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    pub fn external_api(api: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ExternalApi,
            format!("external API error ({}): {}", api, message.into()),
        )
    }

    pub fn service_unavailable(service: &str) -> Self {
        Self::new(
            ErrorKind::ServiceUnavailable,
            format!("service {} unavailable", service),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalServer, message)
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

/// Wire shape of every classified error.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    code: &'static str,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.kind.code(), message = %self.message, "request failed");
        } else {
            tracing::debug!(code = self.kind.code(), message = %self.message, "request rejected");
        }
        let body = ErrorBody {
            success: false,
            message: &self.message,
            code: self.kind.code(),
            retry_after: self.retry_after_secs,
            details: self.details.as_ref(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
