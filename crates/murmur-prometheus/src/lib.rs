// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for Murmur.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Metrics are
//! rendered in Prometheus text format through the gateway's `/metrics`
//! endpoint.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use murmur_core::types::{AdapterType, HealthStatus};
use murmur_core::{MurmurError, PluginAdapter};

pub use recording::{
    record_ai_response, record_cache_request, record_job, record_message_submitted,
    record_rate_limited, register_metrics,
};

/// Installs the Prometheus recorder and keeps the handle used to render it.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Installs the recorder globally. Only one recorder can exist per
    /// process; a second call fails.
    pub fn new() -> Result<Self, MurmurError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            MurmurError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Message, job and cache counters in Prometheus text format, served on
    /// `/metrics`.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, MurmurError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MurmurError> {
        Ok(())
    }
}
