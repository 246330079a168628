// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message-send pipeline.
//!
//! [`MessagePipeline::submit`] validates the content, checks chatroom
//! ownership and the daily quota, stores the user message, and then either
//! generates the AI reply inline or hands it to the background worker and
//! returns a task id to poll.

use std::sync::Arc;

use murmur_config::model::{DeliveryMode, LimitsConfig, PipelineConfig};
use murmur_core::types::{
    ChatroomId, Message, MessageId, MessagePage, MessageStatus, Principal, TaskId,
    UserMessageInsert,
};
use murmur_core::{MurmurError, StorageAdapter};
use murmur_usage::{UsageLimiter, UsageReport};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::metrics;
use crate::reply::{GeneratedReply, ReplyGenerator};
use crate::safety::analyze_message_safety;
use crate::tasks::{TaskRecord, TaskState, TaskStatusStore, new_task_id};
use crate::worker::{AiJob, AiJobQueue};

pub const DEFAULT_MESSAGES_PER_PAGE: u32 = 50;
pub const MAX_MESSAGES_PER_PAGE: u32 = 100;

/// Pipeline behaviour fixed at deployment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub delivery_mode: DeliveryMode,
    pub enforce_safety: bool,
    pub max_message_chars: usize,
}

impl PipelineSettings {
    pub fn from_config(pipeline: &PipelineConfig, limits: &LimitsConfig) -> Self {
        Self {
            delivery_mode: pipeline.delivery_mode,
            enforce_safety: pipeline.enforce_safety,
            max_message_chars: limits.max_message_chars,
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The reply was generated within the request. `reply` is `None` only
    /// when not even the apology reply could be stored.
    Inline {
        user_message: Message,
        reply: Option<GeneratedReply>,
    },
    /// The reply will be produced by a background job.
    Deferred {
        user_message: Message,
        task_id: TaskId,
    },
}

impl SubmitOutcome {
    pub fn user_message(&self) -> &Message {
        match self {
            Self::Inline { user_message, .. } | Self::Deferred { user_message, .. } => user_message,
        }
    }
}

/// A task record plus the reply it produced, once completed.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusView {
    #[serde(flatten)]
    pub record: TaskRecord,
    pub ai_message: Option<Message>,
}

/// A user message and, when available, its reply.
#[derive(Debug, Clone, Serialize)]
pub struct MessageStatusView {
    pub user_message: Message,
    pub ai_message: Option<Message>,
    pub ai_status: &'static str,
}

pub struct MessagePipeline {
    storage: Arc<dyn StorageAdapter>,
    limiter: UsageLimiter,
    generator: Arc<ReplyGenerator>,
    tasks: TaskStatusStore,
    queue: Option<AiJobQueue>,
    settings: PipelineSettings,
}

impl MessagePipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        limiter: UsageLimiter,
        generator: Arc<ReplyGenerator>,
        tasks: TaskStatusStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            limiter,
            generator,
            tasks,
            queue: None,
            settings,
        }
    }

    /// Enables deferred delivery through `queue`.
    pub fn with_queue(mut self, queue: AiJobQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    fn deferred_queue(&self) -> Option<&AiJobQueue> {
        match self.settings.delivery_mode {
            DeliveryMode::Deferred => self.queue.as_ref(),
            DeliveryMode::Sync => None,
        }
    }

    /// Accepts a user message and arranges its AI reply.
    #[instrument(skip_all, fields(user_id = %principal.user_id, chatroom_id = %chatroom_id))]
    pub async fn submit(
        &self,
        principal: &Principal,
        chatroom_id: ChatroomId,
        content: &str,
    ) -> Result<SubmitOutcome, MurmurError> {
        let content = validate_content(content, self.settings.max_message_chars)?;

        let verdict = analyze_message_safety(content);
        if !verdict.is_safe {
            warn!(
                categories = ?verdict.categories,
                confidence = verdict.confidence,
                "message flagged by safety check"
            );
            if self.settings.enforce_safety {
                return Err(MurmurError::Validation(
                    "Message was flagged by the content safety check".into(),
                ));
            }
        }

        self.owned_chatroom(principal, chatroom_id).await?;

        let usage = self.limiter.check_daily_usage(principal).await?;
        if !usage.can_send {
            metrics::record_rate_limited();
            return Err(self.limiter.rate_limit_error(usage));
        }

        let inserted = self
            .storage
            .insert_user_message(
                chatroom_id,
                principal.user_id,
                content,
                MessageStatus::Completed,
                self.limiter.quota_claim(principal),
            )
            .await?;
        let user_message = match inserted {
            UserMessageInsert::Accepted {
                message,
                daily_count,
            } => {
                info!(message_id = %message.id, daily_count, "user message accepted");
                message
            }
            UserMessageInsert::QuotaExhausted { used } => {
                metrics::record_rate_limited();
                let limit = self
                    .limiter
                    .daily_limit_for(principal.tier)
                    .unwrap_or(used);
                return Err(self
                    .limiter
                    .rate_limit_error(UsageLimiter::basic_snapshot(used, limit)));
            }
        };
        metrics::record_message_submitted(&principal.tier.to_string());

        if let Some(queue) = self.deferred_queue() {
            let task_id = new_task_id();
            let job = AiJob {
                task_id: task_id.clone(),
                message_id: user_message.id,
                content: user_message.content.clone(),
                chatroom_id,
                user_id: principal.user_id,
            };
            self.tasks
                .publish(&TaskRecord::new(
                    task_id.clone(),
                    principal.user_id,
                    user_message.id,
                    TaskState::Processing,
                ))
                .await;
            match queue.enqueue(&job).await {
                Ok(_) => {
                    info!(task_id = %task_id, "AI reply deferred");
                    return Ok(SubmitOutcome::Deferred {
                        user_message,
                        task_id,
                    });
                }
                Err(e) => warn!(error = %e, "enqueue failed, generating reply inline"),
            }
        }

        let reply = self.generator.reply_or_apology(&user_message).await;
        let user_message = self
            .storage
            .get_message(user_message.id)
            .await
            .ok()
            .flatten()
            .unwrap_or(user_message);
        Ok(SubmitOutcome::Inline {
            user_message,
            reply,
        })
    }

    /// Polls a deferred task on behalf of `principal`.
    pub async fn task_status(
        &self,
        principal: &Principal,
        task_id: &TaskId,
    ) -> Result<TaskStatusView, MurmurError> {
        let record = self.tasks.get(task_id, principal.user_id).await?;
        let ai_message = match &record.state {
            TaskState::Completed { ai_message_id, .. } => {
                self.storage.get_message(*ai_message_id).await?
            }
            _ => None,
        };
        Ok(TaskStatusView { record, ai_message })
    }

    /// A user message and its reply, if any.
    pub async fn message_status(
        &self,
        principal: &Principal,
        message_id: MessageId,
    ) -> Result<MessageStatusView, MurmurError> {
        let user_message = self
            .storage
            .get_message(message_id)
            .await?
            .filter(|m| m.user_id == principal.user_id && !m.kind.is_ai())
            .ok_or_else(|| MurmurError::not_found("message", "Message not found or access denied"))?;
        let ai_message = self.storage.find_ai_reply(message_id).await?;
        let ai_status = match (&ai_message, user_message.status) {
            (Some(_), _) => "completed",
            (None, MessageStatus::Failed) => "failed",
            (None, _) => "processing",
        };
        Ok(MessageStatusView {
            user_message,
            ai_message,
            ai_status,
        })
    }

    /// A page of a chatroom's messages, oldest first.
    pub async fn list_messages(
        &self,
        principal: &Principal,
        chatroom_id: ChatroomId,
        page: Option<u32>,
        per_page: Option<u32>,
        include_pending: bool,
    ) -> Result<MessagePage, MurmurError> {
        self.owned_chatroom(principal, chatroom_id).await?;
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(DEFAULT_MESSAGES_PER_PAGE)
            .clamp(1, MAX_MESSAGES_PER_PAGE);
        let offset = u64::from(page - 1) * u64::from(per_page);
        let (messages, total_count) = self
            .storage
            .list_messages(chatroom_id, include_pending, per_page, offset)
            .await?;
        Ok(MessagePage {
            messages,
            total_count,
            page,
            per_page,
            has_next: offset + u64::from(per_page) < u64::try_from(total_count).unwrap_or(0),
            has_previous: page > 1,
        })
    }

    /// Today's quota, chatroom allowance and recent history.
    pub async fn usage(&self, principal: &Principal) -> Result<UsageReport, MurmurError> {
        self.limiter.usage_report(principal).await
    }

    async fn owned_chatroom(
        &self,
        principal: &Principal,
        chatroom_id: ChatroomId,
    ) -> Result<(), MurmurError> {
        self.storage
            .get_owned_chatroom(chatroom_id, principal.user_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| {
                MurmurError::not_found("chatroom", "Chatroom not found or access denied")
            })
    }
}

/// Trims `content` and checks it is non-empty and at most `max_chars` long.
pub fn validate_content(content: &str, max_chars: usize) -> Result<&str, MurmurError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(MurmurError::Validation(
            "Message content cannot be empty".into(),
        ));
    }
    if trimmed.chars().count() > max_chars {
        return Err(MurmurError::Validation(format!(
            "Message content cannot exceed {max_chars} characters"
        )));
    }
    Ok(trimmed)
}
