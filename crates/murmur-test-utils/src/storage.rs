// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage double that refuses AI reply inserts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use murmur_core::types::{
    AdapterType, Chatroom, ChatroomId, ChatroomSummary, ChatroomUpdate, DailyUsage, HealthStatus,
    Message, MessageId, MessageStatus, NewChatroom, QueueEntry, QueueFailure, QuotaClaim,
    SubscriptionTier, User, UserId, UserMessageInsert,
};
use murmur_core::{MurmurError, PluginAdapter, StorageAdapter};

/// Wraps a real store and fails every `insert_ai_reply`, so neither a
/// generated reply nor the apology can be persisted. Everything else goes
/// to the inner store.
pub struct RejectingReplyStorage {
    inner: Arc<dyn StorageAdapter>,
}

impl RejectingReplyStorage {
    pub fn new(inner: Arc<dyn StorageAdapter>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl PluginAdapter for RejectingReplyStorage {
    fn name(&self) -> &str {
        "rejecting-reply-storage"
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        self.inner.adapter_type()
    }

    async fn health_check(&self) -> Result<HealthStatus, MurmurError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), MurmurError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl StorageAdapter for RejectingReplyStorage {
    async fn initialize(&self) -> Result<(), MurmurError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), MurmurError> {
        self.inner.close().await
    }

    async fn create_user(&self, mobile_number: &str) -> Result<User, MurmurError> {
        self.inner.create_user(mobile_number).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, MurmurError> {
        self.inner.get_user(id).await
    }

    async fn get_user_by_mobile(&self, mobile_number: &str) -> Result<Option<User>, MurmurError> {
        self.inner.get_user_by_mobile(mobile_number).await
    }

    async fn set_subscription_tier(
        &self,
        id: UserId,
        tier: SubscriptionTier,
    ) -> Result<bool, MurmurError> {
        self.inner.set_subscription_tier(id, tier).await
    }

    async fn create_chatroom(
        &self,
        owner: UserId,
        chatroom: &NewChatroom,
        cap: Option<i64>,
    ) -> Result<Option<Chatroom>, MurmurError> {
        self.inner.create_chatroom(owner, chatroom, cap).await
    }

    async fn count_chatrooms(&self, owner: UserId) -> Result<i64, MurmurError> {
        self.inner.count_chatrooms(owner).await
    }

    async fn get_owned_chatroom(
        &self,
        id: ChatroomId,
        owner: UserId,
    ) -> Result<Option<Chatroom>, MurmurError> {
        self.inner.get_owned_chatroom(id, owner).await
    }

    async fn update_chatroom(
        &self,
        id: ChatroomId,
        owner: UserId,
        update: &ChatroomUpdate,
    ) -> Result<Option<Chatroom>, MurmurError> {
        self.inner.update_chatroom(id, owner, update).await
    }

    async fn delete_chatroom(&self, id: ChatroomId, owner: UserId) -> Result<bool, MurmurError> {
        self.inner.delete_chatroom(id, owner).await
    }

    async fn list_chatroom_summaries(
        &self,
        owner: UserId,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<ChatroomSummary>, i64), MurmurError> {
        self.inner.list_chatroom_summaries(owner, limit, offset).await
    }

    async fn insert_user_message(
        &self,
        chatroom_id: ChatroomId,
        user_id: UserId,
        content: &str,
        status: MessageStatus,
        quota: Option<QuotaClaim>,
    ) -> Result<UserMessageInsert, MurmurError> {
        self.inner
            .insert_user_message(chatroom_id, user_id, content, status, quota)
            .await
    }

    async fn insert_ai_reply(
        &self,
        parent: MessageId,
        _content: &str,
        _parent_status: Option<MessageStatus>,
    ) -> Result<Message, MurmurError> {
        Err(MurmurError::Internal(format!(
            "reply insert for message {parent} rejected"
        )))
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, MurmurError> {
        self.inner.get_message(id).await
    }

    async fn find_ai_reply(&self, parent: MessageId) -> Result<Option<Message>, MurmurError> {
        self.inner.find_ai_reply(parent).await
    }

    async fn update_message_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<(), MurmurError> {
        self.inner.update_message_status(id, status).await
    }

    async fn recent_completed_messages(
        &self,
        chatroom_id: ChatroomId,
        limit: usize,
    ) -> Result<Vec<Message>, MurmurError> {
        self.inner.recent_completed_messages(chatroom_id, limit).await
    }

    async fn list_messages(
        &self,
        chatroom_id: ChatroomId,
        include_pending: bool,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<Message>, i64), MurmurError> {
        self.inner
            .list_messages(chatroom_id, include_pending, limit, offset)
            .await
    }

    async fn get_daily_usage(&self, user_id: UserId, date: NaiveDate) -> Result<i64, MurmurError> {
        self.inner.get_daily_usage(user_id, date).await
    }

    async fn increment_daily_usage(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<i64, MurmurError> {
        self.inner.increment_daily_usage(user_id, date).await
    }

    async fn usage_history(
        &self,
        user_id: UserId,
        since: NaiveDate,
    ) -> Result<Vec<DailyUsage>, MurmurError> {
        self.inner.usage_history(user_id, since).await
    }

    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        max_attempts: i32,
    ) -> Result<i64, MurmurError> {
        self.inner.enqueue(queue_name, payload, max_attempts).await
    }

    async fn dequeue(
        &self,
        queue_name: &str,
        lock: Duration,
    ) -> Result<Option<QueueEntry>, MurmurError> {
        self.inner.dequeue(queue_name, lock).await
    }

    async fn ack(&self, id: i64) -> Result<(), MurmurError> {
        self.inner.ack(id).await
    }

    async fn fail(&self, id: i64, backoff: Duration) -> Result<QueueFailure, MurmurError> {
        self.inner.fail(id, backoff).await
    }

    async fn reclaim_expired(&self, queue_name: &str) -> Result<usize, MurmurError> {
        self.inner.reclaim_expired(queue_name).await
    }
}
