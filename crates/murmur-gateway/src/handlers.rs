// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health, authentication, account and usage handlers.

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use murmur_auth::{OtpPurpose, normalize_mobile_number};
use murmur_core::types::{HealthStatus, Principal, SubscriptionTier, User, UserId};
use murmur_core::{MurmurError, StorageAdapter};
use murmur_usage::UsageReport;
use serde::{Deserialize, Serialize};

use crate::error::{ApiResponse, ApiResult};
use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub storage: String,
    /// `mock` when no AI backend is configured.
    pub ai_mode: &'static str,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let storage = match state.services.storage.health_check().await {
        Ok(HealthStatus::Healthy) => "healthy".to_string(),
        Ok(HealthStatus::Degraded(reason)) => format!("degraded: {reason}"),
        Ok(HealthStatus::Unhealthy(reason)) => format!("unhealthy: {reason}"),
        Err(e) => format!("unhealthy: {e}"),
    };
    let healthy = storage == "healthy";
    let body = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        storage,
        ai_mode: if state.services.responder.is_mock() {
            "mock"
        } else {
            "backend"
        },
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct MobileRequest {
    pub mobile_number: String,
}

#[derive(Debug, Serialize)]
pub struct SignupData {
    pub mobile_number: String,
    pub next_step: &'static str,
}

/// POST /v1/auth/signup
pub async fn post_signup(
    State(state): State<GatewayState>,
    Json(body): Json<MobileRequest>,
) -> ApiResult<impl IntoResponse> {
    let mobile_number = normalize_mobile_number(&body.mobile_number)?;
    state
        .services
        .storage
        .create_user(&mobile_number)
        .await
        .map_err(|e| match e {
            MurmurError::Conflict(_) => MurmurError::Conflict(
                "User with this mobile number already exists".into(),
            ),
            other => other,
        })?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            "User registered successfully. Please verify your mobile number with OTP.",
            SignupData {
                mobile_number,
                next_step: "Send OTP to verify your mobile number",
            },
        ),
    ))
}

#[derive(Debug, Serialize)]
pub struct OtpData {
    /// Present only when OTP exposure is enabled.
    pub otp_code: Option<String>,
    pub expires_in_minutes: u64,
    pub mobile_number: String,
}

async fn issue_otp(
    state: &GatewayState,
    raw_mobile: &str,
    purpose: OtpPurpose,
) -> Result<OtpData, MurmurError> {
    let mobile_number = normalize_mobile_number(raw_mobile)?;
    state
        .services
        .storage
        .get_user_by_mobile(&mobile_number)
        .await?
        .ok_or_else(|| MurmurError::not_found("user", "User not found. Please register first."))?;
    let issued = state.otp.issue(&mobile_number, purpose).await?;
    Ok(OtpData {
        otp_code: state.expose_otp.then_some(issued.otp_code),
        expires_in_minutes: state.otp.ttl().as_secs().div_ceil(60),
        mobile_number,
    })
}

/// POST /v1/auth/send-otp
pub async fn post_send_otp(
    State(state): State<GatewayState>,
    Json(body): Json<MobileRequest>,
) -> ApiResult<Json<ApiResponse<OtpData>>> {
    let data = issue_otp(&state, &body.mobile_number, OtpPurpose::Login).await?;
    Ok(ApiResponse::ok("OTP sent successfully", data))
}

/// POST /v1/auth/forgot-password
pub async fn post_forgot_password(
    State(state): State<GatewayState>,
    Json(body): Json<MobileRequest>,
) -> ApiResult<Json<ApiResponse<OtpData>>> {
    let data = issue_otp(&state, &body.mobile_number, OtpPurpose::ForgotPassword).await?;
    Ok(ApiResponse::ok("Password reset OTP sent successfully", data))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub mobile_number: String,
    pub otp_code: String,
}

#[derive(Debug, Serialize)]
pub struct LoginData {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in_hours: u64,
    pub user: User,
}

/// POST /v1/auth/verify-otp
pub async fn post_verify_otp(
    State(state): State<GatewayState>,
    Json(body): Json<VerifyOtpRequest>,
) -> ApiResult<Json<ApiResponse<LoginData>>> {
    let mobile_number = normalize_mobile_number(&body.mobile_number)?;
    state
        .otp
        .verify(&mobile_number, &body.otp_code, OtpPurpose::Login)
        .await?;

    let user = state
        .services
        .storage
        .get_user_by_mobile(&mobile_number)
        .await?
        .ok_or_else(|| MurmurError::Unauthenticated("User not found".into()))?;
    if !user.is_active {
        return Err(MurmurError::Unauthenticated("Inactive user".into()).into());
    }
    let access_token = state.tokens.issue(&user)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(ApiResponse::ok(
        "Login successful",
        LoginData {
            access_token,
            token_type: "bearer",
            expires_in_hours: state.tokens.expiration_hours(),
            user,
        },
    ))
}

async fn current_user(
    storage: &dyn StorageAdapter,
    principal: &Principal,
) -> Result<User, MurmurError> {
    storage
        .get_user(principal.user_id)
        .await?
        .ok_or_else(|| MurmurError::Unauthenticated("User not found".into()))
}

/// GET /v1/user/me
pub async fn get_me(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let user = current_user(state.services.storage.as_ref(), &principal).await?;
    Ok(ApiResponse::ok("User retrieved successfully", user))
}

/// GET /v1/usage
pub async fn get_usage(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<UsageReport>>> {
    let report = state.services.pipeline.usage(&principal).await?;
    Ok(ApiResponse::ok("Usage retrieved successfully", report))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatus {
    pub user_id: UserId,
    pub subscription_tier: SubscriptionTier,
    pub is_pro: bool,
}

/// GET /v1/subscription/status
pub async fn get_subscription_status(
    State(state): State<GatewayState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ApiResponse<SubscriptionStatus>>> {
    let user = current_user(state.services.storage.as_ref(), &principal).await?;
    Ok(ApiResponse::ok(
        "Subscription status retrieved successfully",
        SubscriptionStatus {
            user_id: user.id,
            subscription_tier: user.subscription_tier,
            is_pro: user.subscription_tier.is_pro(),
        },
    ))
}
