// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators the core depends on.
//!
//! Collaborator handles are constructed once at process start and passed
//! into services as `Arc<dyn Trait>`, so tests can swap in doubles.

pub mod adapter;
pub mod identity;
pub mod kv;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use identity::IdentityResolver;
pub use kv::{KvStore, KvStoreExt};
pub use provider::ProviderAdapter;
pub use storage::StorageAdapter;
