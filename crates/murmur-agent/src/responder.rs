// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI reply generation with timing and fallback handling.
//!
//! [`AiResponder`] wraps a [`ProviderAdapter`]. With no configured backend it
//! answers from the canned table in [`crate::mock`]; a backend error becomes
//! an [`AiResponse::Failed`] carrying a fallback text, never an `Err`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use murmur_context::render_prompt;
use murmur_core::ProviderAdapter;
use murmur_core::types::{CompletionRequest, ConversationTurn};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::mock::{MOCK_MODEL, mock_reply};

/// Reply used when the backend call fails.
pub const FALLBACK_REPLY: &str =
    "I apologize, but I'm experiencing technical difficulties. Please try again later.";

/// Reply used when the backend returns no text.
pub const EMPTY_BACKEND_REPLY: &str =
    "I apologize, but I couldn't generate a response. Please try again.";

/// Model name reported alongside [`FALLBACK_REPLY`].
pub const FALLBACK_MODEL: &str = "fallback";

#[derive(Debug, Clone, PartialEq)]
pub enum AiResponse {
    Generated {
        content: String,
        processing_time: Duration,
        model: String,
        mock: bool,
    },
    Failed {
        error: String,
        fallback_content: String,
        processing_time: Duration,
    },
}

impl AiResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }

    /// The text to show the user: generated content or the fallback.
    pub fn content(&self) -> &str {
        match self {
            Self::Generated { content, .. } => content,
            Self::Failed {
                fallback_content, ..
            } => fallback_content,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Generated { model, .. } => model,
            Self::Failed { .. } => FALLBACK_MODEL,
        }
    }

    pub fn processing_time(&self) -> Duration {
        match self {
            Self::Generated {
                processing_time, ..
            }
            | Self::Failed {
                processing_time, ..
            } => *processing_time,
        }
    }
}

/// Generates AI replies for user messages.
pub struct AiResponder {
    provider: Option<Arc<dyn ProviderAdapter>>,
    system_prompt: String,
}

impl AiResponder {
    /// A responder over `provider`. An absent or unconfigured provider puts
    /// the responder in mock mode.
    pub fn new(provider: Option<Arc<dyn ProviderAdapter>>, system_prompt: impl Into<String>) -> Self {
        let provider = provider.filter(|p| p.is_configured());
        match &provider {
            Some(p) => info!(provider = p.name(), "AI responder using backend"),
            None => warn!("AI backend not configured; responder will use mock replies"),
        }
        Self {
            provider,
            system_prompt: system_prompt.into(),
        }
    }

    /// A responder that always answers from the canned table.
    pub fn mock(system_prompt: impl Into<String>) -> Self {
        Self::new(None, system_prompt)
    }

    pub fn is_mock(&self) -> bool {
        self.provider.is_none()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Produces a reply to `user_message` given the prior `history`.
    ///
    /// `system_prompt` overrides the configured instruction. Processing time
    /// is measured from entry to return.
    pub async fn generate(
        &self,
        user_message: &str,
        history: &[ConversationTurn],
        system_prompt: Option<&str>,
    ) -> AiResponse {
        let started = Instant::now();

        let Some(provider) = &self.provider else {
            let response = AiResponse::Generated {
                content: mock_reply(user_message),
                processing_time: started.elapsed(),
                model: MOCK_MODEL.to_string(),
                mock: true,
            };
            metrics::record_ai_response("mock", response.processing_time().as_secs_f64());
            return response;
        };

        let prompt = render_prompt(
            system_prompt.unwrap_or(&self.system_prompt),
            history,
            user_message,
        );
        debug!(
            history_turns = history.len(),
            prompt_chars = prompt.len(),
            "calling AI backend"
        );

        let response = match provider.complete(CompletionRequest::new(prompt)).await {
            Ok(completion) => {
                let text = completion.text.trim();
                let content = if text.is_empty() {
                    warn!("empty response from AI backend");
                    EMPTY_BACKEND_REPLY.to_string()
                } else {
                    text.to_string()
                };
                AiResponse::Generated {
                    content,
                    processing_time: started.elapsed(),
                    model: completion.model,
                    mock: false,
                }
            }
            Err(e) => {
                warn!(error = %e, "AI backend call failed, using fallback reply");
                AiResponse::Failed {
                    error: e.to_string(),
                    fallback_content: FALLBACK_REPLY.to_string(),
                    processing_time: started.elapsed(),
                }
            }
        };

        let outcome = if response.is_success() {
            "backend"
        } else {
            "fallback"
        };
        metrics::record_ai_response(outcome, response.processing_time().as_secs_f64());
        response
    }
}
