// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response envelope and the mapping from [`MurmurError`] to HTTP.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use murmur_core::MurmurError;
use serde::Serialize;
use serde_json::Value;

/// The `{success, message, data}` body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

/// A [`MurmurError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub MurmurError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<MurmurError> for ApiError {
    fn from(err: MurmurError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MurmurError::NotFound { .. } => StatusCode::NOT_FOUND,
            MurmurError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            MurmurError::ChatroomLimitExceeded { .. } => StatusCode::BAD_REQUEST,
            MurmurError::Forbidden(_) => StatusCode::FORBIDDEN,
            MurmurError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MurmurError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            MurmurError::Conflict(_) => StatusCode::CONFLICT,
            MurmurError::Provider { .. } => StatusCode::BAD_GATEWAY,
            MurmurError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            MurmurError::Storage { .. } | MurmurError::Config(_) | MurmurError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message_and_data(&self) -> (String, Option<Value>) {
        match &self.0 {
            MurmurError::NotFound { detail, .. } => (detail.clone(), None),
            MurmurError::RateLimitExceeded { message, usage } => (
                message.clone(),
                usage.and_then(|u| serde_json::to_value(u).ok()),
            ),
            MurmurError::ChatroomLimitExceeded { message, allowance } => {
                (message.clone(), serde_json::to_value(allowance).ok())
            }
            MurmurError::Forbidden(m)
            | MurmurError::Validation(m)
            | MurmurError::Unauthenticated(m)
            | MurmurError::Conflict(m) => (m.clone(), None),
            MurmurError::Provider { .. } => ("AI service unavailable".into(), None),
            MurmurError::Timeout { .. } => ("Request timed out".into(), None),
            MurmurError::Storage { .. } | MurmurError::Config(_) | MurmurError::Internal(_) => {
                ("Internal server error".into(), None)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }
        let (message, data) = self.message_and_data();
        let body = ApiResponse {
            success: false,
            message,
            data,
        };
        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
