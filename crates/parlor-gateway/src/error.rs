// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error envelope returned by every failing route: `{code, details, error}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use parlor_core::ParlorError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub details: String,
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub details: String,
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, details: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status,
            details: details.into(),
            error: error.into(),
        }
    }

    pub fn unauthorized(details: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, details, "unauthorized")
    }

    pub fn forbidden(details: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, details, "forbidden")
    }

    pub fn bad_request(details: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, details, error)
    }
}

impl From<ParlorError> for ApiError {
    fn from(err: ParlorError) -> Self {
        let status = match &err {
            ParlorError::Validation(_) => StatusCode::BAD_REQUEST,
            ParlorError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ParlorError::Forbidden(_) => StatusCode::FORBIDDEN,
            ParlorError::NotFound(_) => StatusCode::NOT_FOUND,
            ParlorError::Conflict(_) => StatusCode::CONFLICT,
            ParlorError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            details: err.to_string(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.status.as_u16(),
            details: self.details,
            error: self.error,
        };
        (self.status, Json(body)).into_response()
    }
}
