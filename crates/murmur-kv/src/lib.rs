// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value stores backing OTP codes, cached listings, and task status.
//!
//! [`MemoryKv`] is the in-process store. [`DisabledKv`] behaves like an
//! unreachable store: every read misses and every write reports failure,
//! which callers must tolerate.

mod disabled;
mod memory;

use std::sync::Arc;
use std::time::Duration;

use murmur_config::model::{CacheConfig, KvBackend};
use murmur_core::KvStore;
use tokio_util::sync::CancellationToken;

pub use disabled::DisabledKv;
pub use memory::MemoryKv;

/// Builds the configured store. For the memory backend, an expiry sweep is
/// spawned and runs until `cancel` fires.
pub fn build_kv(config: &CacheConfig, cancel: CancellationToken) -> Arc<dyn KvStore> {
    match config.backend {
        KvBackend::Memory => {
            let store = Arc::new(MemoryKv::new());
            store.spawn_sweeper(Duration::from_secs(config.sweep_interval_secs.max(1)), cancel);
            store
        }
        KvBackend::Disabled => {
            tracing::warn!("key-value store disabled; caching, OTP and task status are unavailable");
            Arc::new(DisabledKv)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn disabled_backend_warns_and_stores_nothing() {
        let config = CacheConfig {
            backend: KvBackend::Disabled,
            ..CacheConfig::default()
        };
        let kv = build_kv(&config, CancellationToken::new());

        assert!(logs_contain("key-value store disabled"));
        assert!(!kv.set("k", "v".into(), None).await);
        assert_eq!(kv.get("k").await, None);
    }

    #[tokio::test]
    async fn memory_backend_keeps_values() {
        let cancel = CancellationToken::new();
        let kv = build_kv(&CacheConfig::default(), cancel.clone());

        assert!(kv.set("k", "v".into(), Some(Duration::from_secs(60))).await);
        assert_eq!(kv.get("k").await.as_deref(), Some("v"));
        cancel.cancel();
    }
}
