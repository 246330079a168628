// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Murmur integration tests.
//!
//! Provides provider doubles and a harness wiring real SQLite storage in a
//! temp directory, an in-memory key-value store and the full service graph.
//!
//! # Components
//!
//! - [`MockProvider`] - AI backend returning queued responses and recording prompts
//! - [`FailingProvider`] - AI backend whose every call fails
//! - [`RejectingReplyStorage`] - real storage that refuses AI reply inserts
//! - [`TestHarness`] - assembled services plus user and chatroom helpers

pub mod harness;
pub mod mock_provider;
pub mod storage;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::{FailingProvider, MockProvider};
pub use storage::RejectingReplyStorage;
