// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tier-based usage limits.
//!
//! The [`UsageLimiter`] answers two questions for a principal: may they send
//! another message today, and may they create another chatroom. Pro users
//! are unlimited; Basic users are held to the caps in `LimitsConfig`.
//! Persisted counters in the relational store are the only source of truth.

pub mod limiter;

pub use limiter::{UNLIMITED, UsageLimiter, UsageReport};
