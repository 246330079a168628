// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progress records for deferred AI replies.
//!
//! Each deferred submission gets an opaque [`TaskId`]. The worker publishes
//! a [`TaskRecord`] as the job moves through [`TaskState`]; the submitting
//! user polls it until it reaches a terminal state. Records live in the
//! key-value store and expire after the result retention window.

use std::sync::Arc;
use std::time::Duration;

use murmur_core::types::{MessageId, TaskId, UserId};
use murmur_core::{KvStore, KvStoreExt, MurmurError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Lifecycle of a deferred reply. `Processing` is the only non-terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskState {
    Processing,
    Completed {
        ai_message_id: MessageId,
        /// Seconds spent generating the reply.
        processing_time: f64,
        model: String,
    },
    Failed {
        error: String,
    },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub user_id: UserId,
    /// The user message the task replies to.
    pub message_id: MessageId,
    #[serde(flatten)]
    pub state: TaskState,
    pub updated_at: String,
}

impl TaskRecord {
    pub fn new(task_id: TaskId, user_id: UserId, message_id: MessageId, state: TaskState) -> Self {
        Self {
            task_id,
            user_id,
            message_id,
            state,
            updated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// Generates a fresh opaque task identifier.
pub fn new_task_id() -> TaskId {
    TaskId(uuid::Uuid::new_v4().to_string())
}

fn task_key(task_id: &TaskId) -> String {
    format!("task:{}", task_id.0)
}

/// Publishes and reads [`TaskRecord`]s.
#[derive(Clone)]
pub struct TaskStatusStore {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl TaskStatusStore {
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Writes `record` with the retention TTL. Returns `false` when the
    /// store is unavailable or when a `Processing` record would replace a
    /// terminal one.
    pub async fn publish(&self, record: &TaskRecord) -> bool {
        let key = task_key(&record.task_id);
        if !record.state.is_terminal() {
            if let Some(existing) = self.kv.get_json::<TaskRecord>(&key).await {
                if existing.state.is_terminal() {
                    debug!(task_id = %record.task_id.0, "ignoring processing update for finished task");
                    return false;
                }
            }
        }
        let stored = self.kv.set_json(&key, record, Some(self.ttl)).await;
        if stored {
            debug!(task_id = %record.task_id.0, status = record.state.as_str(), "task status published");
        } else {
            warn!(task_id = %record.task_id.0, "failed to publish task status");
        }
        stored
    }

    /// Reads a task for `requester`. Absent or expired tasks are
    /// [`MurmurError::NotFound`]; tasks owned by someone else are
    /// [`MurmurError::Forbidden`].
    pub async fn get(&self, task_id: &TaskId, requester: UserId) -> Result<TaskRecord, MurmurError> {
        let record = self
            .kv
            .get_json::<TaskRecord>(&task_key(task_id))
            .await
            .ok_or_else(|| MurmurError::not_found("task", "Task not found or expired"))?;
        if record.user_id != requester {
            return Err(MurmurError::Forbidden("Access denied to this task".into()));
        }
        Ok(record)
    }
}
