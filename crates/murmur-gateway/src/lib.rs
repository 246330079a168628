// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API for the Murmur chat backend.
//!
//! Every JSON response uses the `{success, message, data}` envelope.
//! Routes under `/v1` other than the auth and webhook routes require an
//! `Authorization: Bearer <token>` header.

pub mod auth;
pub mod chat;
pub mod error;
pub mod handlers;
pub mod server;
pub mod webhook;

pub use error::{ApiError, ApiResponse};
pub use server::{GatewayState, HealthState, build_router, start_server};
