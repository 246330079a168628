// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatroom management and the cached chatroom listing.
//!
//! Listings are cached per user, page and page size. Every cached page key
//! embeds the user's current listing generation; [`ChatroomCache::invalidate`]
//! replaces the generation, which orphans all earlier pages at once. Orphans
//! expire with the listing TTL.

use std::sync::Arc;
use std::time::Duration;

use murmur_config::model::LimitsConfig;
use murmur_core::types::{
    Chatroom, ChatroomId, ChatroomPage, ChatroomUpdate, Message, NewChatroom, Principal, UserId,
};
use murmur_core::{KvStore, KvStoreExt, MurmurError, StorageAdapter};
use murmur_usage::UsageLimiter;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::metrics;

pub const DEFAULT_CHATROOMS_PER_PAGE: u32 = 10;
pub const MAX_CHATROOMS_PER_PAGE: u32 = 50;
pub const DEFAULT_RECENT_MESSAGES: u32 = 20;
pub const MAX_RECENT_MESSAGES: u32 = 100;

/// Read-through cache of chatroom listing pages.
#[derive(Clone)]
pub struct ChatroomCache {
    storage: Arc<dyn StorageAdapter>,
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl ChatroomCache {
    pub fn new(storage: Arc<dyn StorageAdapter>, kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { storage, kv, ttl }
    }

    fn generation_key(user: UserId) -> String {
        format!("chatrooms:user:{user}:gen")
    }

    fn page_key(user: UserId, generation: &str, page: u32, per_page: u32) -> String {
        format!("chatrooms:user:{user}:v{generation}:page:{page}:per:{per_page}")
    }

    /// The current generation, starting a new one when none is stored.
    async fn generation(&self, user: UserId) -> Option<String> {
        let key = Self::generation_key(user);
        if let Some(current) = self.kv.get(&key).await {
            return Some(current);
        }
        let fresh = uuid::Uuid::new_v4().simple().to_string();
        self.kv
            .set(&key, fresh.clone(), Some(self.ttl))
            .await
            .then_some(fresh)
    }

    /// One page of `user`'s chatrooms, most recent activity first.
    ///
    /// `page` and `per_page` are clamped to valid values before they are
    /// used in the cache key, so equivalent requests share an entry.
    pub async fn get_user_chatrooms(
        &self,
        user: UserId,
        page: Option<u32>,
        per_page: Option<u32>,
        use_cache: bool,
    ) -> Result<ChatroomPage, MurmurError> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(DEFAULT_CHATROOMS_PER_PAGE)
            .clamp(1, MAX_CHATROOMS_PER_PAGE);

        let key = if use_cache {
            self.generation(user)
                .await
                .map(|generation| Self::page_key(user, &generation, page, per_page))
        } else {
            None
        };

        if let Some(key) = &key {
            if let Some(cached) = self.kv.get_json::<ChatroomPage>(key).await {
                debug!(user_id = %user, page, per_page, "chatroom listing cache hit");
                metrics::record_cache_request("hit");
                return Ok(cached);
            }
            debug!(user_id = %user, page, per_page, "chatroom listing cache miss");
            metrics::record_cache_request("miss");
        }

        let offset = u64::from(page - 1) * u64::from(per_page);
        let (chatrooms, total_count) = self
            .storage
            .list_chatroom_summaries(user, per_page, offset)
            .await?;
        let listing = ChatroomPage {
            chatrooms,
            total_count,
            page,
            per_page,
            has_next: offset + u64::from(per_page) < u64::try_from(total_count).unwrap_or(0),
            has_previous: page > 1,
        };

        if let Some(key) = &key {
            self.kv.set_json(key, &listing, Some(self.ttl)).await;
        }
        Ok(listing)
    }

    /// Drops every cached listing page for `user`.
    pub async fn invalidate(&self, user: UserId) {
        let key = Self::generation_key(user);
        let fresh = uuid::Uuid::new_v4().simple().to_string();
        if !self.kv.set(&key, fresh, Some(self.ttl)).await {
            // An unreachable store serves nothing stale either.
            self.kv.delete(&key).await;
        }
        debug!(user_id = %user, "chatroom listing cache invalidated");
    }
}

/// A chatroom with its message count and the most recent messages.
#[derive(Debug, Clone, Serialize)]
pub struct ChatroomDetail {
    #[serde(flatten)]
    pub chatroom: Chatroom,
    pub message_count: i64,
    /// Oldest first.
    pub recent_messages: Vec<Message>,
}

/// Owner-scoped chatroom operations.
pub struct ChatroomService {
    storage: Arc<dyn StorageAdapter>,
    limiter: UsageLimiter,
    cache: ChatroomCache,
    max_name_chars: usize,
    max_description_chars: usize,
}

impl ChatroomService {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        limiter: UsageLimiter,
        cache: ChatroomCache,
        limits: &LimitsConfig,
    ) -> Self {
        Self {
            storage,
            limiter,
            cache,
            max_name_chars: limits.max_chatroom_name_chars,
            max_description_chars: limits.max_description_chars,
        }
    }

    #[instrument(skip_all, fields(user_id = %principal.user_id))]
    pub async fn create(
        &self,
        principal: &Principal,
        name: &str,
        description: Option<&str>,
    ) -> Result<Chatroom, MurmurError> {
        let chatroom = NewChatroom {
            name: self.validate_name(name)?,
            description: self.validate_description(description)?,
        };

        let allowance = self.limiter.check_chatroom_limit(principal).await?;
        if !allowance.can_create {
            return Err(self.limiter.chatroom_limit_error(allowance));
        }

        let cap = self.limiter.chatroom_limit_for(principal.tier);
        let Some(created) = self
            .storage
            .create_chatroom(principal.user_id, &chatroom, cap)
            .await?
        else {
            // Another request took the last slot after the check above.
            let allowance = self.limiter.check_chatroom_limit(principal).await?;
            return Err(self.limiter.chatroom_limit_error(allowance));
        };

        self.cache.invalidate(principal.user_id).await;
        info!(chatroom_id = %created.id, "chatroom created");
        Ok(created)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        page: Option<u32>,
        per_page: Option<u32>,
        use_cache: bool,
    ) -> Result<ChatroomPage, MurmurError> {
        self.cache
            .get_user_chatrooms(principal.user_id, page, per_page, use_cache)
            .await
    }

    /// The chatroom plus its last `recent` messages in chronological order.
    pub async fn detail(
        &self,
        principal: &Principal,
        id: ChatroomId,
        recent: Option<u32>,
    ) -> Result<ChatroomDetail, MurmurError> {
        let chatroom = self.owned(principal, id).await?;
        let limit = recent
            .unwrap_or(DEFAULT_RECENT_MESSAGES)
            .clamp(1, MAX_RECENT_MESSAGES);
        let (_, message_count) = self.storage.list_messages(id, false, 0, 0).await?;
        let offset = u64::try_from(message_count - i64::from(limit)).unwrap_or(0);
        let (recent_messages, _) = self.storage.list_messages(id, false, limit, offset).await?;
        Ok(ChatroomDetail {
            chatroom,
            message_count,
            recent_messages,
        })
    }

    /// Applies a partial update. A blank description clears it.
    #[instrument(skip_all, fields(user_id = %principal.user_id, chatroom_id = %id))]
    pub async fn update(
        &self,
        principal: &Principal,
        id: ChatroomId,
        update: ChatroomUpdate,
    ) -> Result<Chatroom, MurmurError> {
        let update = ChatroomUpdate {
            name: update
                .name
                .as_deref()
                .map(|name| self.validate_name(name))
                .transpose()?,
            description: update
                .description
                .map(|description| self.validate_description(description.as_deref()))
                .transpose()?,
        };
        let updated = self
            .storage
            .update_chatroom(id, principal.user_id, &update)
            .await?
            .ok_or_else(Self::missing)?;
        self.cache.invalidate(principal.user_id).await;
        info!("chatroom updated");
        Ok(updated)
    }

    /// Deletes the chatroom and, through the store's cascade, its messages.
    #[instrument(skip_all, fields(user_id = %principal.user_id, chatroom_id = %id))]
    pub async fn delete(&self, principal: &Principal, id: ChatroomId) -> Result<(), MurmurError> {
        if !self.storage.delete_chatroom(id, principal.user_id).await? {
            return Err(Self::missing());
        }
        self.cache.invalidate(principal.user_id).await;
        info!("chatroom deleted");
        Ok(())
    }

    async fn owned(&self, principal: &Principal, id: ChatroomId) -> Result<Chatroom, MurmurError> {
        self.storage
            .get_owned_chatroom(id, principal.user_id)
            .await?
            .ok_or_else(Self::missing)
    }

    fn missing() -> MurmurError {
        MurmurError::not_found("chatroom", "Chatroom not found or access denied")
    }

    fn validate_name(&self, name: &str) -> Result<String, MurmurError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MurmurError::Validation(
                "Chatroom name cannot be empty".into(),
            ));
        }
        if name.chars().count() > self.max_name_chars {
            return Err(MurmurError::Validation(format!(
                "Chatroom name cannot exceed {} characters",
                self.max_name_chars
            )));
        }
        Ok(name.to_string())
    }

    fn validate_description(&self, description: Option<&str>) -> Result<Option<String>, MurmurError> {
        let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) else {
            return Ok(None);
        };
        if description.chars().count() > self.max_description_chars {
            return Err(MurmurError::Validation(format!(
                "Description cannot exceed {} characters",
                self.max_description_chars
            )));
        }
        Ok(Some(description.to_string()))
    }
}
