// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Murmur chat backend.

use thiserror::Error;

use crate::types::{ChatroomAllowance, UsageSnapshot};

/// The primary error type used across all Murmur adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MurmurError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// AI backend errors (API failure, missing credentials, malformed reply).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A chatroom, message, task, or user is absent or not owned by the caller.
    #[error("{resource} not found: {detail}")]
    NotFound {
        resource: &'static str,
        detail: String,
    },

    /// The daily message quota is exhausted.
    #[error("{message}")]
    RateLimitExceeded {
        message: String,
        usage: Option<UsageSnapshot>,
    },

    /// The caller already owns the maximum number of chatrooms for their tier.
    #[error("{message}")]
    ChatroomLimitExceeded {
        message: String,
        allowance: ChatroomAllowance,
    },

    /// The caller is authenticated but not allowed to see the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Input failed validation (empty or oversized content, bad pagination).
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing, malformed, or expired credentials, or an inactive account.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// A uniqueness constraint was violated (e.g. a mobile number already registered).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MurmurError {
    /// Shorthand for a [`MurmurError::NotFound`] with a formatted detail.
    pub fn not_found(resource: &'static str, detail: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            detail: detail.into(),
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Returns `true` when retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Provider { .. } | Self::Timeout { .. } | Self::Internal(_)
        )
    }
}
