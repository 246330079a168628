// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation context for AI generation.
//!
//! [`ConversationContextBuilder`] turns the most recent completed messages of
//! a chatroom into role-tagged turns, oldest first. [`render_prompt`] folds a
//! system instruction, those turns, and the new user message into the single
//! prompt string sent to the backend.

pub mod history;
pub mod prompt;

pub use history::{ConversationContextBuilder, DEFAULT_HISTORY_WINDOW, assemble_turns};
pub use prompt::{PROMPT_HISTORY_TURNS, render_prompt};
