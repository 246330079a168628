// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background AI reply jobs.
//!
//! [`AiJobQueue`] persists jobs in the storage queue and wakes idle workers.
//! [`JobRunner`] runs `concurrency` worker loops that claim jobs, generate
//! the reply under the soft time limit, and run each attempt under the hard
//! limit. Every attempt first checks whether a reply for the user message
//! already exists, so a retried job never stores a second reply.

use std::sync::Arc;
use std::time::Duration;

use murmur_config::model::JobsConfig;
use murmur_core::types::{ChatroomId, MessageId, QueueEntry, QueueFailure, TaskId, UserId};
use murmur_core::{MurmurError, StorageAdapter};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics;
use crate::reply::{GeneratedReply, ReplyGenerator, UNKNOWN_MODEL};
use crate::tasks::{TaskRecord, TaskState, TaskStatusStore};

/// Queue name for AI reply jobs.
pub const AI_REPLY_QUEUE: &str = "ai_reply";

/// Extra lock time beyond the hard limit before a claimed job is reclaimed.
const LOCK_GRACE: Duration = Duration::from_secs(30);

/// Payload of one deferred reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiJob {
    pub task_id: TaskId,
    pub message_id: MessageId,
    pub content: String,
    pub chatroom_id: ChatroomId,
    pub user_id: UserId,
}

/// Time and retry limits for job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSettings {
    pub concurrency: usize,
    pub max_attempts: i32,
    pub retry_backoff: Duration,
    pub soft_time_limit: Duration,
    pub hard_time_limit: Duration,
    pub poll_interval: Duration,
}

impl From<&JobsConfig> for JobSettings {
    fn from(config: &JobsConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            max_attempts: i32::try_from(config.max_retries)
                .unwrap_or(i32::MAX - 1)
                .saturating_add(1),
            retry_backoff: Duration::from_secs(config.retry_backoff_secs),
            soft_time_limit: Duration::from_secs(config.soft_time_limit_secs),
            hard_time_limit: Duration::from_secs(config.hard_time_limit_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(10)),
        }
    }
}

/// Enqueues AI reply jobs.
#[derive(Clone)]
pub struct AiJobQueue {
    storage: Arc<dyn StorageAdapter>,
    notify: Arc<Notify>,
    max_attempts: i32,
}

impl AiJobQueue {
    pub fn new(storage: Arc<dyn StorageAdapter>, max_attempts: i32) -> Self {
        Self {
            storage,
            notify: Arc::new(Notify::new()),
            max_attempts,
        }
    }

    /// Persists `job` and wakes a worker. Returns the queue entry id.
    pub async fn enqueue(&self, job: &AiJob) -> Result<i64, MurmurError> {
        let payload = serde_json::to_string(job)
            .map_err(|e| MurmurError::Internal(format!("failed to encode job: {e}")))?;
        let id = self
            .storage
            .enqueue(AI_REPLY_QUEUE, &payload, self.max_attempts)
            .await?;
        debug!(queue_id = id, task_id = %job.task_id, "AI reply job enqueued");
        self.notify.notify_one();
        Ok(id)
    }

    fn notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }
}

/// What one attempt of a job produced.
#[derive(Debug)]
enum Attempt {
    Replied(GeneratedReply),
    /// A reply was stored by an earlier attempt.
    AlreadyReplied(MessageId),
}

/// Runs AI reply jobs from the storage queue.
pub struct JobRunner {
    storage: Arc<dyn StorageAdapter>,
    notify: Arc<Notify>,
    generator: Arc<ReplyGenerator>,
    tasks: TaskStatusStore,
    settings: JobSettings,
}

impl JobRunner {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        queue: &AiJobQueue,
        generator: Arc<ReplyGenerator>,
        tasks: TaskStatusStore,
        settings: JobSettings,
    ) -> Self {
        Self {
            storage,
            notify: queue.notifier(),
            generator,
            tasks,
            settings,
        }
    }

    /// Starts the worker loops. They exit once `cancel` fires, after
    /// finishing any job in flight.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        info!(workers = self.settings.concurrency, "starting AI reply workers");
        (0..self.settings.concurrency)
            .map(|worker| {
                let runner = Arc::clone(self);
                let cancel = cancel.clone();
                tokio::spawn(async move { runner.worker_loop(worker, cancel).await })
            })
            .collect()
    }

    async fn worker_loop(&self, worker: usize, cancel: CancellationToken) {
        debug!(worker, "AI reply worker started");
        loop {
            if worker == 0 {
                match self.storage.reclaim_expired(AI_REPLY_QUEUE).await {
                    Ok(0) => {}
                    Ok(reclaimed) => warn!(reclaimed, "reclaimed jobs with expired locks"),
                    Err(e) => warn!(error = %e, "failed to reclaim expired jobs"),
                }
            }

            loop {
                if cancel.is_cancelled() {
                    break;
                }
                match self.run_once().await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => {
                        warn!(worker, error = %e, "failed to claim job");
                        break;
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
        debug!(worker, "AI reply worker stopped");
    }

    /// Claims and processes at most one job. Returns `false` when the queue
    /// had nothing available.
    pub async fn run_once(&self) -> Result<bool, MurmurError> {
        let lock = self.settings.hard_time_limit + LOCK_GRACE;
        let Some(entry) = self.storage.dequeue(AI_REPLY_QUEUE, lock).await? else {
            return Ok(false);
        };
        self.process(entry).await;
        Ok(true)
    }

    #[instrument(skip_all, fields(queue_id = entry.id, attempt = entry.attempts + 1))]
    async fn process(&self, entry: QueueEntry) {
        let job: AiJob = match serde_json::from_str(&entry.payload) {
            Ok(job) => job,
            Err(e) => {
                error!(error = %e, "dropping undecodable AI reply job");
                self.ack(entry.id).await;
                metrics::record_job("failed");
                return;
            }
        };

        let hard = self.settings.hard_time_limit;
        let result = match tokio::time::timeout(hard, self.attempt(&job)).await {
            Ok(result) => result,
            Err(_) => Err(MurmurError::Timeout { duration: hard }),
        };

        match result {
            Ok(Attempt::Replied(reply)) => {
                self.publish(&job, completed_state(&reply)).await;
                self.ack(entry.id).await;
                metrics::record_job("completed");
                info!(task_id = %job.task_id, ai_message_id = %reply.message.id, "AI reply job completed");
            }
            Ok(Attempt::AlreadyReplied(ai_message_id)) => {
                if !self.task_is_terminal(&job).await {
                    self.publish(
                        &job,
                        TaskState::Completed {
                            ai_message_id,
                            processing_time: 0.0,
                            model: UNKNOWN_MODEL.into(),
                        },
                    )
                    .await;
                }
                self.ack(entry.id).await;
                metrics::record_job("skipped");
                info!(task_id = %job.task_id, "reply already exists, job skipped");
            }
            Err(e) => self.handle_failure(&entry, &job, e).await,
        }
    }

    async fn attempt(&self, job: &AiJob) -> Result<Attempt, MurmurError> {
        if let Some(existing) = self.storage.find_ai_reply(job.message_id).await? {
            return Ok(Attempt::AlreadyReplied(existing.id));
        }
        let message = self
            .storage
            .get_message(job.message_id)
            .await?
            .ok_or_else(|| MurmurError::not_found("message", format!("message {} not found", job.message_id)))?;
        let reply = self
            .generator
            .generate(&message, Some(self.settings.soft_time_limit))
            .await?;
        Ok(Attempt::Replied(reply))
    }

    async fn handle_failure(&self, entry: &QueueEntry, job: &AiJob, err: MurmurError) {
        warn!(task_id = %job.task_id, error = %err, "AI reply job attempt failed");
        let retryable = !matches!(err, MurmurError::NotFound { .. });

        match self.generator.persist_apology(job.message_id).await {
            Ok(apology) => {
                self.publish(job, completed_state(&apology)).await;
                self.ack(entry.id).await;
                metrics::record_job("fallback");
                return;
            }
            Err(e) => warn!(task_id = %job.task_id, error = %e, "could not store apology reply"),
        }

        if !retryable {
            self.ack(entry.id).await;
            self.publish(job, TaskState::Failed { error: err.to_string() }).await;
            metrics::record_job("failed");
            error!(task_id = %job.task_id, error = %err, "AI reply job failed permanently");
            return;
        }

        match self.storage.fail(entry.id, self.settings.retry_backoff).await {
            Ok(QueueFailure::Rescheduled { attempts }) => {
                metrics::record_job("retried");
                info!(
                    task_id = %job.task_id,
                    attempts,
                    backoff_secs = self.settings.retry_backoff.as_secs(),
                    "AI reply job rescheduled"
                );
            }
            Ok(QueueFailure::Exhausted { attempts }) => {
                self.publish(job, TaskState::Failed { error: err.to_string() }).await;
                metrics::record_job("failed");
                error!(task_id = %job.task_id, attempts, error = %err, "AI reply job exhausted retries");
            }
            Err(e) => error!(task_id = %job.task_id, error = %e, "failed to record job failure"),
        }
    }

    async fn task_is_terminal(&self, job: &AiJob) -> bool {
        self.tasks
            .get(&job.task_id, job.user_id)
            .await
            .is_ok_and(|record| record.state.is_terminal())
    }

    async fn publish(&self, job: &AiJob, state: TaskState) {
        let record = TaskRecord::new(job.task_id.clone(), job.user_id, job.message_id, state);
        self.tasks.publish(&record).await;
    }

    async fn ack(&self, id: i64) {
        if let Err(e) = self.storage.ack(id).await {
            warn!(queue_id = id, error = %e, "failed to acknowledge job");
        }
    }
}

fn completed_state(reply: &GeneratedReply) -> TaskState {
    TaskState::Completed {
        ai_message_id: reply.message.id,
        processing_time: reply.processing_time.as_secs_f64(),
        model: reply.model.clone(),
    }
}
