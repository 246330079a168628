// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use murmur_agent::Services;
use murmur_auth::{OtpService, TokenIssuer};
use murmur_config::model::ServerConfig;
use murmur_core::{IdentityResolver, MurmurError};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::{chat, handlers, webhook};

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            prometheus_render: None,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub services: Services,
    pub identity: Arc<dyn IdentityResolver>,
    pub tokens: Arc<TokenIssuer>,
    pub otp: Arc<OtpService>,
    /// Return issued OTP codes in responses.
    pub expose_otp: bool,
    pub health: HealthState,
}

/// Builds the full route table.
pub fn build_router(state: GatewayState, cors_permissive: bool) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .route("/v1/auth/signup", post(handlers::post_signup))
        .route("/v1/auth/send-otp", post(handlers::post_send_otp))
        .route("/v1/auth/forgot-password", post(handlers::post_forgot_password))
        .route("/v1/auth/verify-otp", post(handlers::post_verify_otp))
        .route("/v1/webhook/stripe", post(webhook::post_stripe_webhook))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/user/me", get(handlers::get_me))
        .route("/v1/usage", get(handlers::get_usage))
        .route("/v1/subscription/status", get(handlers::get_subscription_status))
        .route(
            "/v1/chatroom",
            post(chat::create_chatroom).get(chat::list_chatrooms),
        )
        .route(
            "/v1/chatroom/{id}",
            get(chat::get_chatroom)
                .put(chat::update_chatroom)
                .delete(chat::delete_chatroom),
        )
        .route("/v1/chatroom/{id}/message", post(chat::send_message))
        .route("/v1/chatroom/{id}/messages", get(chat::list_messages))
        .route("/v1/message/{id}/status", get(chat::get_message_status))
        .route("/v1/tasks/{task_id}", get(chat::get_task_status))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http());

    if cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Binds `bind_address:port` and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), MurmurError> {
    let app = build_router(state, config.cors_permissive);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MurmurError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| MurmurError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
