// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Murmur chat backend.
//!
//! This crate provides the error type, the domain types, and the adapter
//! traits for every collaborator the message pipeline talks to: the
//! relational store, the key-value store, the AI backend, and the identity
//! resolver.

pub mod error;
pub mod traits;
pub mod types;

pub use error::MurmurError;
pub use types::{AdapterType, HealthStatus};

pub use traits::{
    IdentityResolver, KvStore, KvStoreExt, PluginAdapter, ProviderAdapter, StorageAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Storage,
            AdapterType::Provider,
            AdapterType::KeyValue,
            AdapterType::Identity,
            AdapterType::Observability,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        assert_eq!(HealthStatus::Healthy, HealthStatus::Healthy);
        assert_ne!(HealthStatus::Degraded("slow".into()), HealthStatus::Healthy);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_kv_store<T: KvStore>() {}
        fn _assert_identity<T: IdentityResolver>() {}
    }
}
