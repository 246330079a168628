// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use murmur_core::KvStore;

/// A store that is never reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledKv;

#[async_trait]
impl KvStore for DisabledKv {
    async fn set(&self, key: &str, _value: String, _ttl: Option<Duration>) -> bool {
        tracing::debug!(key, "kv disabled, dropping write");
        false
    }

    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn delete(&self, _key: &str) -> bool {
        false
    }

    async fn exists(&self, _key: &str) -> bool {
        false
    }
}
