// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Produces and persists the AI reply to one user message.
//!
//! Shared by the inline path and the background worker. The user message
//! moves `Completed -> Processing` while its reply is generated, then back
//! to `Completed` in the same transaction that inserts the reply.

use std::sync::Arc;
use std::time::Duration;

use murmur_context::ConversationContextBuilder;
use murmur_core::types::{Message, MessageId, MessageStatus};
use murmur_core::{MurmurError, StorageAdapter};
use tracing::{info, instrument, warn};

use crate::responder::AiResponder;

/// Reply stored when generation itself breaks down.
pub const APOLOGY_REPLY: &str =
    "I apologize, but I encountered an error while processing your message. Please try again.";

/// Model name reported for [`APOLOGY_REPLY`].
pub const APOLOGY_MODEL: &str = "error_fallback";

/// Model name reported for a reply found already stored, whose producing
/// model was not recorded.
pub const UNKNOWN_MODEL: &str = "unknown";

/// A persisted AI reply and how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReply {
    pub message: Message,
    pub processing_time: Duration,
    pub model: String,
}

pub struct ReplyGenerator {
    storage: Arc<dyn StorageAdapter>,
    context: ConversationContextBuilder,
    responder: Arc<AiResponder>,
}

impl ReplyGenerator {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        context: ConversationContextBuilder,
        responder: Arc<AiResponder>,
    ) -> Self {
        Self {
            storage,
            context,
            responder,
        }
    }

    /// Generates and stores the reply to `user_message`.
    ///
    /// Backend failures are absorbed into a fallback reply; errors returned
    /// here come from storage or from exceeding `time_limit`.
    #[instrument(skip_all, fields(message_id = %user_message.id))]
    pub async fn generate(
        &self,
        user_message: &Message,
        time_limit: Option<Duration>,
    ) -> Result<GeneratedReply, MurmurError> {
        self.storage
            .update_message_status(user_message.id, MessageStatus::Processing)
            .await?;

        let history = self.context.build(user_message.chatroom_id).await?;
        let pending = self
            .responder
            .generate(&user_message.content, &history, None);
        let response = match time_limit {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| MurmurError::Timeout { duration: limit })?,
            None => pending.await,
        };
        if !response.is_success() {
            warn!("AI generation failed, storing fallback reply");
        }

        let message = self
            .storage
            .insert_ai_reply(
                user_message.id,
                response.content(),
                Some(MessageStatus::Completed),
            )
            .await?;
        info!(ai_message_id = %message.id, model = response.model(), "AI reply stored");

        Ok(GeneratedReply {
            message,
            processing_time: response.processing_time(),
            model: response.model().to_string(),
        })
    }

    /// Marks the user message failed and stores the apology reply, unless a
    /// reply already exists, in which case that reply is returned as
    /// [`UNKNOWN_MODEL`] rather than as an apology.
    pub async fn persist_apology(&self, parent: MessageId) -> Result<GeneratedReply, MurmurError> {
        if let Some(existing) = self.storage.find_ai_reply(parent).await? {
            info!(message_id = %parent, ai_message_id = %existing.id, "reply already stored, no apology needed");
            return Ok(GeneratedReply {
                message: existing,
                processing_time: Duration::ZERO,
                model: UNKNOWN_MODEL.to_string(),
            });
        }
        if let Err(e) = self
            .storage
            .update_message_status(parent, MessageStatus::Failed)
            .await
        {
            warn!(message_id = %parent, error = %e, "could not mark message failed");
        }
        let message = self
            .storage
            .insert_ai_reply(parent, APOLOGY_REPLY, None)
            .await?;
        Ok(GeneratedReply {
            message,
            processing_time: Duration::ZERO,
            model: APOLOGY_MODEL.to_string(),
        })
    }

    /// Inline variant: on any generation error, falls back to the apology.
    /// `None` only when even the apology could not be stored.
    pub async fn reply_or_apology(&self, user_message: &Message) -> Option<GeneratedReply> {
        match self.generate(user_message, None).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(message_id = %user_message.id, error = %e, "inline generation failed");
                match self.persist_apology(user_message.id).await {
                    Ok(apology) => Some(apology),
                    Err(e) => {
                        warn!(message_id = %user_message.id, error = %e, "could not store apology reply");
                        None
                    }
                }
            }
        }
    }
}
