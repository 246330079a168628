// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment provider webhook endpoint.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;

use crate::error::{ApiResponse, ApiResult};
use crate::server::GatewayState;

/// Header carrying `t=<unix>,v1=<hex hmac>`.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /v1/webhook/stripe
///
/// The body is taken as raw bytes so the signature is checked against exactly
/// what was sent.
pub async fn post_stripe_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<()>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let event_type = state
        .services
        .billing
        .handle_webhook(signature, &body)
        .await?;
    Ok(Json(ApiResponse {
        success: true,
        message: format!("Webhook event {event_type} processed successfully"),
        data: None,
    }))
}
