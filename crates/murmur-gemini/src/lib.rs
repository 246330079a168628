// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini provider adapter for Murmur.
//!
//! Implements [`ProviderAdapter`] over the `generateContent` endpoint. A
//! single rendered prompt goes out as one user turn; the first candidate's
//! text comes back.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use murmur_config::model::GeminiConfig;
use murmur_core::types::{AdapterType, CompletionRequest, CompletionResponse, HealthStatus};
use murmur_core::{MurmurError, PluginAdapter, ProviderAdapter};
use tracing::{debug, info};

use crate::client::GeminiClient;
use crate::types::GenerateContentRequest;

/// Gemini provider implementing [`ProviderAdapter`].
pub struct GeminiProvider {
    client: GeminiClient,
    model: String,
    max_output_tokens: u32,
}

impl GeminiProvider {
    /// Builds the provider. Fails with [`MurmurError::Config`] when no API
    /// key is configured; callers use mock mode instead.
    pub fn new(config: &GeminiConfig) -> Result<Self, MurmurError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| MurmurError::Config("gemini.api_key is not set".into()))?;
        let client = GeminiClient::new(
            api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(model = %config.model, "Gemini provider initialized");
        Ok(Self {
            client,
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Replaces the HTTP client.
    pub fn with_client(mut self, client: GeminiClient) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
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
impl ProviderAdapter for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, MurmurError> {
        let model = request.model.unwrap_or_else(|| self.model.clone());
        let max_tokens = request.max_output_tokens.unwrap_or(self.max_output_tokens);
        let body = GenerateContentRequest::from_prompt(&request.prompt, Some(max_tokens));

        let response = self.client.generate_content(&model, &body).await?;
        let text = response.text();
        debug!(model = %model, chars = text.len(), "Gemini completion finished");
        Ok(CompletionResponse { text, model })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, api_key: Option<&str>) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
            ..GeminiConfig::default()
        }
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = GeminiProvider::new(&config("http://localhost", None))
            .err()
            .unwrap();
        assert!(matches!(err, MurmurError::Config(_)));
        assert!(GeminiProvider::new(&config("http://localhost", Some("  "))).is_err());
    }

    #[tokio::test]
    async fn complete_uses_configured_model_and_token_cap() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-lite:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {"maxOutputTokens": 1024}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Sure thing."}]}}]
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config(&server.uri(), Some("k"))).unwrap();
        assert!(provider.is_configured());
        let resp = provider
            .complete(CompletionRequest::new("System: hi\n\nUser: hello\nAI Assistant:"))
            .await
            .unwrap();
        assert_eq!(resp.text, "Sure thing.");
        assert_eq!(resp.model, "gemini-2.0-flash-lite");
    }
}
