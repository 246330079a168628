// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use murmur_config::model::LimitsConfig;
use murmur_core::types::{
    ChatroomAllowance, DailyUsage, Principal, QuotaClaim, SubscriptionTier, UsageSnapshot, UserId,
};
use murmur_core::{MurmurError, StorageAdapter};
use serde::Serialize;
use tracing::{debug, warn};

/// Sentinel for "no limit" in snapshots returned to clients.
pub const UNLIMITED: i64 = -1;

/// Days of history included in a [`UsageReport`].
const HISTORY_DAYS: u64 = 30;

/// Everything the usage endpoint shows a user.
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub daily: UsageSnapshot,
    pub chatrooms: ChatroomAllowance,
    pub history: Vec<DailyUsage>,
}

/// Enforces daily message quotas and chatroom caps per subscription tier.
#[derive(Clone)]
pub struct UsageLimiter {
    storage: Arc<dyn StorageAdapter>,
    daily_messages: i64,
    max_chatrooms: i64,
}

impl UsageLimiter {
    pub fn new(storage: Arc<dyn StorageAdapter>, limits: &LimitsConfig) -> Self {
        Self {
            storage,
            daily_messages: i64::from(limits.basic_daily_messages),
            max_chatrooms: i64::from(limits.basic_max_chatrooms),
        }
    }

    /// The current UTC calendar date; quotas roll over at midnight UTC.
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Daily message cap for `tier`, `None` when unlimited.
    pub fn daily_limit_for(&self, tier: SubscriptionTier) -> Option<i64> {
        match tier {
            SubscriptionTier::Basic => Some(self.daily_messages),
            SubscriptionTier::Pro => None,
        }
    }

    /// Chatroom cap for `tier`, `None` when unlimited.
    pub fn chatroom_limit_for(&self, tier: SubscriptionTier) -> Option<i64> {
        match tier {
            SubscriptionTier::Basic => Some(self.max_chatrooms),
            SubscriptionTier::Pro => None,
        }
    }

    /// Reports whether `principal` may send another message today.
    ///
    /// Pro users always may, and their counter stays at zero since their
    /// sends carry no quota claim. Storage failures propagate and never
    /// grant access.
    pub async fn check_daily_usage(
        &self,
        principal: &Principal,
    ) -> Result<UsageSnapshot, MurmurError> {
        let used = self
            .storage
            .get_daily_usage(principal.user_id, Self::today())
            .await?;
        let Some(limit) = self.daily_limit_for(principal.tier) else {
            return Ok(UsageSnapshot {
                can_send: true,
                used,
                limit: UNLIMITED,
                remaining: UNLIMITED,
                tier: principal.tier,
            });
        };
        let snapshot = Self::basic_snapshot(used, limit);
        debug!(
            user_id = %principal.user_id,
            used,
            limit,
            can_send = snapshot.can_send,
            "checked daily usage"
        );
        Ok(snapshot)
    }

    /// Adds one message to today's counter and returns the new count.
    pub async fn increment_daily_usage(&self, user_id: UserId) -> Result<i64, MurmurError> {
        let count = self
            .storage
            .increment_daily_usage(user_id, Self::today())
            .await?;
        debug!(user_id = %user_id, count, "daily usage incremented");
        Ok(count)
    }

    /// The claim to attach to an accepted message insert, `None` for tiers
    /// that do not consume quota.
    pub fn quota_claim(&self, principal: &Principal) -> Option<QuotaClaim> {
        self.daily_limit_for(principal.tier)
            .map(|daily_limit| QuotaClaim {
                date: Self::today(),
                daily_limit,
            })
    }

    /// Reports whether `principal` may create another chatroom.
    pub async fn check_chatroom_limit(
        &self,
        principal: &Principal,
    ) -> Result<ChatroomAllowance, MurmurError> {
        let current = self.storage.count_chatrooms(principal.user_id).await?;
        let allowance = match self.chatroom_limit_for(principal.tier) {
            None => ChatroomAllowance {
                can_create: true,
                current,
                limit: UNLIMITED,
                remaining: UNLIMITED,
                tier: principal.tier,
            },
            Some(limit) => ChatroomAllowance {
                can_create: current < limit,
                current,
                limit,
                remaining: (limit - current).max(0),
                tier: principal.tier,
            },
        };
        Ok(allowance)
    }

    /// Snapshot, chatroom allowance and the last thirty days of counters.
    pub async fn usage_report(&self, principal: &Principal) -> Result<UsageReport, MurmurError> {
        let daily = self.check_daily_usage(principal).await?;
        let chatrooms = self.check_chatroom_limit(principal).await?;
        let since = Self::today()
            .checked_sub_days(Days::new(HISTORY_DAYS))
            .unwrap_or(NaiveDate::MIN);
        let history = self.storage.usage_history(principal.user_id, since).await?;
        Ok(UsageReport {
            daily,
            chatrooms,
            history,
        })
    }

    /// The error returned when a Basic user has used up today's messages.
    pub fn rate_limit_error(&self, snapshot: UsageSnapshot) -> MurmurError {
        warn!(used = snapshot.used, limit = snapshot.limit, "daily message limit reached");
        MurmurError::RateLimitExceeded {
            message: format!(
                "Daily message limit reached ({} messages/day). Upgrade to Pro for unlimited messages.",
                snapshot.limit
            ),
            usage: Some(snapshot),
        }
    }

    /// The error returned when a Basic user already owns the maximum number
    /// of chatrooms.
    pub fn chatroom_limit_error(&self, allowance: ChatroomAllowance) -> MurmurError {
        MurmurError::ChatroomLimitExceeded {
            message: format!(
                "Basic tier users can create up to {limit} chatrooms. You have {current}/{limit} chatrooms. Upgrade to Pro for unlimited chatrooms.",
                limit = allowance.limit,
                current = allowance.current,
            ),
            allowance,
        }
    }

    /// The snapshot a Basic user sees after `used` messages today.
    pub fn basic_snapshot(used: i64, limit: i64) -> UsageSnapshot {
        UsageSnapshot {
            can_send: used < limit,
            used,
            limit,
            remaining: (limit - used).max(0),
            tier: SubscriptionTier::Basic,
        }
    }
}
