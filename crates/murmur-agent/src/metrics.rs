// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric hooks. Recorded only when built with the `prometheus` feature.

#[cfg(feature = "prometheus")]
pub(crate) use murmur_prometheus::{
    record_ai_response, record_cache_request, record_job, record_message_submitted,
    record_rate_limited,
};

#[cfg(not(feature = "prometheus"))]
mod noop {
    pub(crate) fn record_message_submitted(_tier: &str) {}
    pub(crate) fn record_rate_limited() {}
    pub(crate) fn record_ai_response(_outcome: &'static str, _seconds: f64) {}
    pub(crate) fn record_job(_outcome: &'static str) {}
    pub(crate) fn record_cache_request(_result: &'static str) {}
}

#[cfg(not(feature = "prometheus"))]
pub(crate) use noop::*;
