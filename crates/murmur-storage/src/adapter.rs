// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OnceCell;
use tracing::debug;

use murmur_config::model::StorageConfig;
use murmur_core::types::{
    Chatroom, ChatroomId, ChatroomSummary, ChatroomUpdate, DailyUsage, Message, MessageId,
    MessageStatus, NewChatroom, QueueEntry, QueueFailure, QuotaClaim, SubscriptionTier, User,
    UserId, UserMessageInsert,
};
use murmur_core::{AdapterType, HealthStatus, MurmurError, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened by [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// The underlying database, for callers that need raw queries.
    pub fn database(&self) -> Result<&Database, MurmurError> {
        self.db.get().ok_or_else(|| MurmurError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Activate or deactivate an account.
    pub async fn set_user_active(&self, id: UserId, active: bool) -> Result<bool, MurmurError> {
        queries::users::set_user_active(self.database()?, id, active).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MurmurError> {
        let Ok(db) = self.database() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        let probe = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), MurmurError> {
        if self.db.get().is_some() {
            self.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), MurmurError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| MurmurError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), MurmurError> {
        self.database()?.close().await
    }

    // --- Users ---

    async fn create_user(&self, mobile_number: &str) -> Result<User, MurmurError> {
        queries::users::create_user(self.database()?, mobile_number).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, MurmurError> {
        queries::users::get_user(self.database()?, id).await
    }

    async fn get_user_by_mobile(&self, mobile_number: &str) -> Result<Option<User>, MurmurError> {
        queries::users::get_user_by_mobile(self.database()?, mobile_number).await
    }

    async fn set_subscription_tier(
        &self,
        id: UserId,
        tier: SubscriptionTier,
    ) -> Result<bool, MurmurError> {
        queries::users::set_subscription_tier(self.database()?, id, tier).await
    }

    // --- Chatrooms ---

    async fn create_chatroom(
        &self,
        owner: UserId,
        chatroom: &NewChatroom,
        cap: Option<i64>,
    ) -> Result<Option<Chatroom>, MurmurError> {
        queries::chatrooms::create_chatroom(self.database()?, owner, chatroom, cap).await
    }

    async fn count_chatrooms(&self, owner: UserId) -> Result<i64, MurmurError> {
        queries::chatrooms::count_chatrooms(self.database()?, owner).await
    }

    async fn get_owned_chatroom(
        &self,
        id: ChatroomId,
        owner: UserId,
    ) -> Result<Option<Chatroom>, MurmurError> {
        queries::chatrooms::get_owned_chatroom(self.database()?, id, owner).await
    }

    async fn update_chatroom(
        &self,
        id: ChatroomId,
        owner: UserId,
        update: &ChatroomUpdate,
    ) -> Result<Option<Chatroom>, MurmurError> {
        queries::chatrooms::update_chatroom(self.database()?, id, owner, update).await
    }

    async fn delete_chatroom(&self, id: ChatroomId, owner: UserId) -> Result<bool, MurmurError> {
        queries::chatrooms::delete_chatroom(self.database()?, id, owner).await
    }

    async fn list_chatroom_summaries(
        &self,
        owner: UserId,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<ChatroomSummary>, i64), MurmurError> {
        queries::chatrooms::list_chatroom_summaries(self.database()?, owner, limit, offset).await
    }

    // --- Messages ---

    async fn insert_user_message(
        &self,
        chatroom_id: ChatroomId,
        user_id: UserId,
        content: &str,
        status: MessageStatus,
        quota: Option<QuotaClaim>,
    ) -> Result<UserMessageInsert, MurmurError> {
        queries::messages::insert_user_message(
            self.database()?,
            chatroom_id,
            user_id,
            content,
            status,
            quota,
        )
        .await
    }

    async fn insert_ai_reply(
        &self,
        parent: MessageId,
        content: &str,
        parent_status: Option<MessageStatus>,
    ) -> Result<Message, MurmurError> {
        queries::messages::insert_ai_reply(self.database()?, parent, content, parent_status).await
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, MurmurError> {
        queries::messages::get_message(self.database()?, id).await
    }

    async fn find_ai_reply(&self, parent: MessageId) -> Result<Option<Message>, MurmurError> {
        queries::messages::find_ai_reply(self.database()?, parent).await
    }

    async fn update_message_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<(), MurmurError> {
        queries::messages::update_message_status(self.database()?, id, status).await
    }

    async fn recent_completed_messages(
        &self,
        chatroom_id: ChatroomId,
        limit: usize,
    ) -> Result<Vec<Message>, MurmurError> {
        queries::messages::recent_completed_messages(self.database()?, chatroom_id, limit).await
    }

    async fn list_messages(
        &self,
        chatroom_id: ChatroomId,
        include_pending: bool,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<Message>, i64), MurmurError> {
        queries::messages::list_messages(self.database()?, chatroom_id, include_pending, limit, offset)
            .await
    }

    // --- Daily usage ---

    async fn get_daily_usage(&self, user_id: UserId, date: NaiveDate) -> Result<i64, MurmurError> {
        queries::usage::get_daily_usage(self.database()?, user_id, date).await
    }

    async fn increment_daily_usage(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<i64, MurmurError> {
        queries::usage::increment_daily_usage(self.database()?, user_id, date).await
    }

    async fn usage_history(
        &self,
        user_id: UserId,
        since: NaiveDate,
    ) -> Result<Vec<DailyUsage>, MurmurError> {
        queries::usage::usage_history(self.database()?, user_id, since).await
    }

    // --- Job queue ---

    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        max_attempts: i32,
    ) -> Result<i64, MurmurError> {
        queries::queue::enqueue(self.database()?, queue_name, payload, max_attempts).await
    }

    async fn dequeue(
        &self,
        queue_name: &str,
        lock: Duration,
    ) -> Result<Option<QueueEntry>, MurmurError> {
        queries::queue::dequeue(self.database()?, queue_name, lock).await
    }

    async fn ack(&self, id: i64) -> Result<(), MurmurError> {
        queries::queue::ack(self.database()?, id).await
    }

    async fn fail(&self, id: i64, backoff: Duration) -> Result<QueueFailure, MurmurError> {
        queries::queue::fail(self.database()?, id, backoff).await
    }

    async fn reclaim_expired(&self, queue_name: &str) -> Result<usize, MurmurError> {
        queries::queue::reclaim_expired(self.database()?, queue_name).await
    }
}
