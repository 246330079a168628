// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message pipeline and background reply jobs for the Murmur chat backend.
//!
//! - [`MessagePipeline`] accepts user messages under the daily quota and
//!   produces AI replies inline or through the job queue
//! - [`AiResponder`] talks to the AI backend, or a keyword-based mock when
//!   none is configured
//! - [`JobRunner`] drains the persistent job queue with a pool of workers
//! - [`TaskStatusStore`] tracks deferred replies for polling
//! - [`ChatroomService`] and [`ChatroomCache`] manage chatrooms and their
//!   cached listing
//! - [`BillingService`] applies signed payment webhooks

pub mod billing;
pub mod chatrooms;
mod metrics;
pub mod mock;
pub mod pipeline;
pub mod reply;
pub mod responder;
pub mod safety;
pub mod services;
pub mod tasks;
pub mod worker;

pub use billing::{BillingEvent, BillingOutcome, BillingService};
pub use chatrooms::{ChatroomCache, ChatroomDetail, ChatroomService};
pub use pipeline::{
    MessagePipeline, MessageStatusView, PipelineSettings, SubmitOutcome, TaskStatusView,
};
pub use reply::{GeneratedReply, ReplyGenerator};
pub use responder::{AiResponder, AiResponse};
pub use safety::{SafetyVerdict, analyze_message_safety};
pub use services::Services;
pub use tasks::{TaskRecord, TaskState, TaskStatusStore};
pub use worker::{AiJob, AiJobQueue, JobRunner, JobSettings};
