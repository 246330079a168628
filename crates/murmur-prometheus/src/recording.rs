// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Recording goes through the metrics-rs facade; without an installed
//! recorder every call is a no-op.

use metrics::{describe_counter, describe_histogram};

/// Registers all Murmur metric descriptions. Called once after the recorder
/// is installed.
pub fn register_metrics() {
    describe_counter!(
        "murmur_messages_submitted_total",
        "User messages accepted by the pipeline"
    );
    describe_counter!(
        "murmur_rate_limited_total",
        "Submissions rejected by the daily quota"
    );
    describe_counter!(
        "murmur_ai_responses_total",
        "AI replies produced, by outcome"
    );
    describe_histogram!(
        "murmur_ai_response_seconds",
        "Wall-clock time spent generating an AI reply"
    );
    describe_counter!(
        "murmur_jobs_total",
        "Background AI jobs finished, by outcome"
    );
    describe_counter!(
        "murmur_cache_requests_total",
        "Chatroom listing cache lookups, by result"
    );
}

pub fn record_message_submitted(tier: &str) {
    metrics::counter!("murmur_messages_submitted_total", "tier" => tier.to_string()).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("murmur_rate_limited_total").increment(1);
}

/// `outcome` is one of `backend`, `mock`, `fallback`.
pub fn record_ai_response(outcome: &'static str, seconds: f64) {
    metrics::counter!("murmur_ai_responses_total", "outcome" => outcome).increment(1);
    metrics::histogram!("murmur_ai_response_seconds").record(seconds);
}

/// `outcome` is one of `completed`, `fallback`, `retried`, `failed`, `skipped`.
pub fn record_job(outcome: &'static str) {
    metrics::counter!("murmur_jobs_total", "outcome" => outcome).increment(1);
}

/// `result` is `hit` or `miss`.
pub fn record_cache_request(result: &'static str) {
    metrics::counter!("murmur_cache_requests_total", "result" => result).increment(1);
}
