// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the relational store (SQLite, etc.).

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::MurmurError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Chatroom, ChatroomId, ChatroomSummary, ChatroomUpdate, DailyUsage, Message, MessageId,
    MessageStatus, NewChatroom, QueueEntry, QueueFailure, QuotaClaim, SubscriptionTier, User,
    UserId, UserMessageInsert,
};

/// Adapter for the durable record of users, chatrooms, messages, daily
/// usage counters, and the background job queue.
///
/// Every operation that must be atomic (quota consumption with message
/// insert, capped chatroom creation, AI reply insert with parent status
/// update) is a single call here so implementations can run it in one
/// transaction.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), MurmurError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), MurmurError>;

    // --- Users ---

    /// Registers a new active Basic-tier user. Duplicate numbers yield
    /// [`MurmurError::Conflict`].
    async fn create_user(&self, mobile_number: &str) -> Result<User, MurmurError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, MurmurError>;

    async fn get_user_by_mobile(&self, mobile_number: &str) -> Result<Option<User>, MurmurError>;

    /// Returns `false` when no such user exists.
    async fn set_subscription_tier(
        &self,
        id: UserId,
        tier: SubscriptionTier,
    ) -> Result<bool, MurmurError>;

    // --- Chatrooms ---

    /// Creates a chatroom. With `cap: Some(n)`, the insert only happens when
    /// the owner has fewer than `n` chatrooms; `Ok(None)` means the cap was hit.
    async fn create_chatroom(
        &self,
        owner: UserId,
        chatroom: &NewChatroom,
        cap: Option<i64>,
    ) -> Result<Option<Chatroom>, MurmurError>;

    async fn count_chatrooms(&self, owner: UserId) -> Result<i64, MurmurError>;

    /// Fetches a chatroom only if `owner` owns it.
    async fn get_owned_chatroom(
        &self,
        id: ChatroomId,
        owner: UserId,
    ) -> Result<Option<Chatroom>, MurmurError>;

    async fn update_chatroom(
        &self,
        id: ChatroomId,
        owner: UserId,
        update: &ChatroomUpdate,
    ) -> Result<Option<Chatroom>, MurmurError>;

    /// Deletes a chatroom and all its messages. Returns `false` when nothing
    /// owned by `owner` matched.
    async fn delete_chatroom(&self, id: ChatroomId, owner: UserId) -> Result<bool, MurmurError>;

    /// Lists the owner's chatrooms with message aggregates, most recent
    /// activity first, plus the total count.
    async fn list_chatroom_summaries(
        &self,
        owner: UserId,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<ChatroomSummary>, i64), MurmurError>;

    // --- Messages ---

    /// Inserts a user message. With a quota claim, the daily counter is
    /// incremented in the same transaction, and nothing is written if the
    /// counter already reached the limit.
    async fn insert_user_message(
        &self,
        chatroom_id: ChatroomId,
        user_id: UserId,
        content: &str,
        status: MessageStatus,
        quota: Option<QuotaClaim>,
    ) -> Result<UserMessageInsert, MurmurError>;

    /// Inserts a completed AI message replying to `parent`, which must be a
    /// user message. When `parent_status` is set, the parent's status is
    /// updated in the same transaction.
    async fn insert_ai_reply(
        &self,
        parent: MessageId,
        content: &str,
        parent_status: Option<MessageStatus>,
    ) -> Result<Message, MurmurError>;

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, MurmurError>;

    /// Returns the AI message replying to `parent`, if one exists.
    async fn find_ai_reply(&self, parent: MessageId) -> Result<Option<Message>, MurmurError>;

    /// Moves a message to `status`, rejecting transitions the message state
    /// machine does not allow.
    async fn update_message_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<(), MurmurError>;

    /// The `limit` most recently created completed messages, newest first.
    async fn recent_completed_messages(
        &self,
        chatroom_id: ChatroomId,
        limit: usize,
    ) -> Result<Vec<Message>, MurmurError>;

    /// A page of a chatroom's messages, oldest first, plus the total count.
    /// Without `include_pending`, only completed and failed messages count.
    async fn list_messages(
        &self,
        chatroom_id: ChatroomId,
        include_pending: bool,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<Message>, i64), MurmurError>;

    // --- Daily usage ---

    /// Today's counter for `user_id`, 0 when no row exists yet.
    async fn get_daily_usage(&self, user_id: UserId, date: NaiveDate) -> Result<i64, MurmurError>;

    /// Upserts the counter and returns the incremented value.
    async fn increment_daily_usage(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<i64, MurmurError>;

    /// Counters from `since` onwards, newest first.
    async fn usage_history(
        &self,
        user_id: UserId,
        since: NaiveDate,
    ) -> Result<Vec<DailyUsage>, MurmurError>;

    // --- Job queue ---

    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        max_attempts: i32,
    ) -> Result<i64, MurmurError>;

    /// Claims the oldest available pending entry, locking it for `lock`.
    async fn dequeue(
        &self,
        queue_name: &str,
        lock: Duration,
    ) -> Result<Option<QueueEntry>, MurmurError>;

    async fn ack(&self, id: i64) -> Result<(), MurmurError>;

    /// Records a failed attempt, rescheduling after `backoff` while attempts remain.
    async fn fail(&self, id: i64, backoff: Duration) -> Result<QueueFailure, MurmurError>;

    /// Returns entries whose lock expired (a crashed worker) to pending.
    async fn reclaim_expired(&self, queue_name: &str) -> Result<usize, MurmurError>;
}
