// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the Murmur services.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

integer_id!(
    /// Unique identifier for a user account.
    UserId
);
integer_id!(
    /// Unique identifier for a chatroom.
    ChatroomId
);
integer_id!(
    /// Unique identifier for a message.
    MessageId
);

/// Opaque handle returned by the deferred delivery path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Provider,
    KeyValue,
    Identity,
    Observability,
}

/// Subscription level gating chatroom count and daily message volume.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Basic,
    Pro,
}

impl SubscriptionTier {
    pub fn is_pro(self) -> bool {
        matches!(self, Self::Pro)
    }
}

/// Lifecycle status of a persisted message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl MessageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a message may move from `self` to `next`.
    ///
    /// Nothing ever returns to `Pending`. A terminal user message may re-enter
    /// `Processing` when a background job picks it up or retries it.
    pub fn can_transition_to(self, next: Self) -> bool {
        use MessageStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (_, Pending) => false,
            (Pending, _) => true,
            (Processing, Completed | Failed) => true,
            (Completed | Failed, Processing) => true,
            (Completed, Failed) => true,
            _ => false,
        }
    }
}

/// Whether a message was written by the user or generated in reply to one.
///
/// AI messages always point at the user message that triggered them, so the
/// parent relation is at most two levels deep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Ai { parent_message_id: MessageId },
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai { .. } => "ai",
        }
    }

    pub fn parent(&self) -> Option<MessageId> {
        match self {
            Self::User => None,
            Self::Ai { parent_message_id } => Some(*parent_message_id),
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Self::Ai { .. })
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub mobile_number: String,
    pub is_active: bool,
    pub subscription_tier: SubscriptionTier,
    pub created_at: String,
    pub updated_at: String,
}

/// Authenticated caller handed to every core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub is_active: bool,
    pub tier: SubscriptionTier,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            is_active: user.is_active,
            tier: user.subscription_tier,
        }
    }
}

/// A single-owner conversation space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chatroom {
    pub id: ChatroomId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub created_at: String,
    pub updated_at: String,
}

/// A chatroom together with its message aggregates, as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatroomSummary {
    #[serde(flatten)]
    pub chatroom: Chatroom,
    pub message_count: i64,
    pub last_message_at: Option<String>,
}

/// One page of a user's chatrooms, ordered by most recent activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatroomPage {
    pub chatrooms: Vec<ChatroomSummary>,
    pub total_count: i64,
    pub page: u32,
    pub per_page: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Fields for a new chatroom, already validated and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatroom {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update of a chatroom. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatroomUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    #[serde(flatten)]
    pub kind: MessageKind,
    pub status: MessageStatus,
    pub user_id: UserId,
    pub chatroom_id: ChatroomId,
    pub created_at: String,
    pub updated_at: String,
}

/// One page of a chatroom's messages, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total_count: i64,
    pub page: u32,
    pub per_page: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Per-user, per-calendar-day message counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub user_id: UserId,
    pub date: chrono::NaiveDate,
    pub message_count: i64,
}

/// Result of a daily quota check. `-1` in `limit` and `remaining` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub can_send: bool,
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
    pub tier: SubscriptionTier,
}

/// Result of a chatroom-count check. `-1` in `limit` and `remaining` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatroomAllowance {
    pub can_create: bool,
    pub current: i64,
    pub limit: i64,
    pub remaining: i64,
    pub tier: SubscriptionTier,
}

/// Speaker of a conversation turn sent to the AI backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A role-tagged entry of the conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// A single-prompt request to the AI backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Overrides the provider's configured model when set.
    pub model: Option<String>,
    pub max_output_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            max_output_tokens: None,
        }
    }
}

/// Generated text returned by the AI backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub text: String,
    pub model: String,
}

/// A claim on a user's daily quota, consumed atomically with a message insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaClaim {
    pub date: chrono::NaiveDate,
    pub daily_limit: i64,
}

/// Outcome of inserting a user message under an optional quota claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMessageInsert {
    /// The message was stored. `daily_count` is the post-increment counter
    /// when a quota claim was made.
    Accepted {
        message: Message,
        daily_count: Option<i64>,
    },
    /// The quota was already exhausted; nothing was written.
    QuotaExhausted { used: i64 },
}

/// An entry in the persistent background job queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
    pub available_at: String,
}

/// What happened when a queue entry was reported failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueFailure {
    /// Back to pending; it becomes available again after the backoff.
    Rescheduled { attempts: i32 },
    /// No attempts left; the entry is permanently failed.
    Exhausted { attempts: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn tier_parses_lowercase() {
        assert_eq!(SubscriptionTier::from_str("pro").unwrap(), SubscriptionTier::Pro);
        assert_eq!(SubscriptionTier::Basic.to_string(), "basic");
    }

    #[test]
    fn nothing_returns_to_pending() {
        for from in [
            MessageStatus::Processing,
            MessageStatus::Completed,
            MessageStatus::Failed,
        ] {
            assert!(!from.can_transition_to(MessageStatus::Pending));
        }
    }

    #[test]
    fn processing_resolves_to_terminal_states() {
        assert!(MessageStatus::Processing.can_transition_to(MessageStatus::Completed));
        assert!(MessageStatus::Processing.can_transition_to(MessageStatus::Failed));
        assert!(!MessageStatus::Failed.can_transition_to(MessageStatus::Completed));
    }

    #[test]
    fn message_kind_serializes_as_tagged_columns() {
        let msg = Message {
            id: MessageId(7),
            content: "hi".into(),
            kind: MessageKind::Ai {
                parent_message_id: MessageId(6),
            },
            status: MessageStatus::Completed,
            user_id: UserId(1),
            chatroom_id: ChatroomId(2),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["message_type"], "ai");
        assert_eq!(json["parent_message_id"], 6);
        assert_eq!(json["status"], "completed");

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind.parent(), Some(MessageId(6)));
    }

    #[test]
    fn user_kind_has_no_parent() {
        let json = serde_json::to_value(MessageKind::User).unwrap();
        assert_eq!(json, serde_json::json!({"message_type": "user"}));
        assert_eq!(MessageKind::User.parent(), None);
    }
}
