// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI backend doubles for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use murmur_core::traits::adapter::PluginAdapter;
use murmur_core::traits::provider::ProviderAdapter;
use murmur_core::types::{AdapterType, CompletionRequest, CompletionResponse, HealthStatus};
use murmur_core::MurmurError;

/// Model name reported by [`MockProvider`].
pub const MOCK_PROVIDER_MODEL: &str = "mock-model";

/// A mock AI backend that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned. Every prompt received is
/// recorded for assertions.
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    configured: bool,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            prompts: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            configured: true,
        }
    }

    /// Reports itself as lacking credentials.
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Sleeps for `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, oldest first.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }

    async fn next_response(&self) -> String {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MurmurError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MurmurError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, MurmurError> {
        self.prompts.lock().await.push(request.prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let text = self.next_response().await;
        Ok(CompletionResponse {
            text,
            model: request
                .model
                .unwrap_or_else(|| MOCK_PROVIDER_MODEL.to_string()),
        })
    }
}

/// An AI backend whose every call fails with a provider error.
pub struct FailingProvider {
    message: String,
}

impl FailingProvider {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl PluginAdapter for FailingProvider {
    fn name(&self) -> &str {
        "failing-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MurmurError> {
        Ok(HealthStatus::Unhealthy(self.message.clone()))
    }

    async fn shutdown(&self) -> Result<(), MurmurError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for FailingProvider {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, MurmurError> {
        Err(MurmurError::Provider {
            message: self.message.clone(),
            source: None,
        })
    }
}
