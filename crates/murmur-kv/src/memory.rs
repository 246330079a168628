// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process store with per-entry expiry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use murmur_core::KvStore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Concurrent in-memory store. Expired entries are invisible immediately
/// and physically removed on access or by the sweeper.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, Entry>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Purges expired entries every `interval` until `cancel` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let purged = store.purge_expired();
                        if purged > 0 {
                            debug!(purged, "swept expired kv entries");
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> bool {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        true
    }

    async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()))?;
        if value.is_none() {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        value
    }

    async fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now))
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::KvStoreExt;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let kv = MemoryKv::new();
        assert!(kv.set("otp:+1555", "123456".into(), Some(Duration::from_secs(300))).await);
        assert_eq!(kv.get("otp:+1555").await.as_deref(), Some("123456"));

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(kv.get("otp:+1555").await, None);
        assert!(!kv.exists("otp:+1555").await);
        assert!(kv.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_without_ttl_persist() {
        let kv = MemoryKv::new();
        kv.set("k", "v".into(), None).await;
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(kv.exists("k").await);
    }

    #[tokio::test]
    async fn delete_reports_removal() {
        let kv = MemoryKv::new();
        kv.set("k", "v".into(), None).await;
        assert!(kv.delete("k").await);
        assert!(!kv.delete("k").await);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired() {
        let kv = MemoryKv::new();
        kv.set("short", "1".into(), Some(Duration::from_secs(1))).await;
        kv.set("long", "2".into(), Some(Duration::from_secs(100))).await;
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(kv.purge_expired(), 1);
        assert_eq!(kv.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_stops_on_cancel() {
        let kv = Arc::new(MemoryKv::new());
        kv.set("short", "1".into(), Some(Duration::from_secs(1))).await;
        let cancel = CancellationToken::new();
        let handle = kv.spawn_sweeper(Duration::from_secs(5), cancel.clone());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(kv.is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn json_helpers_round_trip_structs() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Doc {
            status: String,
        }
        let kv = MemoryKv::new();
        assert!(
            kv.set_json("task:1", &Doc { status: "processing".into() }, None)
                .await
        );
        let doc: Option<Doc> = kv.get_json("task:1").await;
        assert_eq!(doc.unwrap().status, "processing");

        kv.set("task:2", "not json".into(), None).await;
        let broken: Option<Doc> = kv.get_json("task:2").await;
        assert!(broken.is_none());
    }
}
