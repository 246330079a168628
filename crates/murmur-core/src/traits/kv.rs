// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store trait used for OTP codes, cached listings, and task status.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// An expiring string key-value store.
///
/// Implementations never return errors. An unreachable store reports
/// `false` / `None` and logs, so every caller treats the store as an
/// optional path.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Stores `value` under `key`, replacing any previous value.
    /// `ttl: None` keeps the entry until it is deleted.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> bool;

    async fn get(&self, key: &str) -> Option<String>;

    /// Returns `true` when an entry was removed.
    async fn delete(&self, key: &str) -> bool;

    async fn exists(&self, key: &str) -> bool;
}

/// JSON helpers available on every [`KvStore`].
#[async_trait]
pub trait KvStoreExt: KvStore {
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool
    where
        T: Serialize + Sync + ?Sized,
    {
        match serde_json::to_string(value) {
            Ok(encoded) => self.set(key, encoded, ttl).await,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to encode kv value");
                false
            }
        }
    }

    /// Decodes the stored JSON. Undecodable entries are treated as absent.
    async fn get_json<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable kv value");
                None
            }
        }
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}
