// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the service graph from configuration and collaborators.

use std::sync::Arc;
use std::time::Duration;

use murmur_config::model::MurmurConfig;
use murmur_context::ConversationContextBuilder;
use murmur_core::{KvStore, ProviderAdapter, StorageAdapter};
use murmur_usage::UsageLimiter;

use crate::billing::BillingService;
use crate::chatrooms::{ChatroomCache, ChatroomService};
use crate::pipeline::{MessagePipeline, PipelineSettings};
use crate::reply::ReplyGenerator;
use crate::responder::AiResponder;
use crate::tasks::TaskStatusStore;
use crate::worker::{AiJobQueue, JobRunner, JobSettings};

/// Every service the HTTP layer and the job workers need, sharing one
/// storage handle and one key-value store.
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<dyn StorageAdapter>,
    pub kv: Arc<dyn KvStore>,
    pub responder: Arc<AiResponder>,
    pub limiter: UsageLimiter,
    pub tasks: TaskStatusStore,
    pub generator: Arc<ReplyGenerator>,
    pub pipeline: Arc<MessagePipeline>,
    pub chatrooms: Arc<ChatroomService>,
    pub billing: Arc<BillingService>,
    pub queue: AiJobQueue,
    pub runner: Arc<JobRunner>,
}

impl Services {
    /// Wires the services. `provider: None` runs the responder in mock mode.
    pub fn assemble(
        config: &MurmurConfig,
        storage: Arc<dyn StorageAdapter>,
        kv: Arc<dyn KvStore>,
        provider: Option<Arc<dyn ProviderAdapter>>,
    ) -> Self {
        let responder = Arc::new(AiResponder::new(provider, config.agent.system_prompt.clone()));
        let limiter = UsageLimiter::new(Arc::clone(&storage), &config.limits);
        let tasks = TaskStatusStore::new(
            Arc::clone(&kv),
            Duration::from_secs(config.jobs.result_ttl_secs),
        );
        let context =
            ConversationContextBuilder::new(Arc::clone(&storage), config.pipeline.history_window);
        let generator = Arc::new(ReplyGenerator::new(
            Arc::clone(&storage),
            context,
            Arc::clone(&responder),
        ));

        let job_settings = JobSettings::from(&config.jobs);
        let queue = AiJobQueue::new(Arc::clone(&storage), job_settings.max_attempts);
        let runner = Arc::new(JobRunner::new(
            Arc::clone(&storage),
            &queue,
            Arc::clone(&generator),
            tasks.clone(),
            job_settings,
        ));

        let pipeline = Arc::new(
            MessagePipeline::new(
                Arc::clone(&storage),
                limiter.clone(),
                Arc::clone(&generator),
                tasks.clone(),
                PipelineSettings::from_config(&config.pipeline, &config.limits),
            )
            .with_queue(queue.clone()),
        );

        let cache = ChatroomCache::new(
            Arc::clone(&storage),
            Arc::clone(&kv),
            Duration::from_secs(config.cache.chatroom_list_ttl_secs),
        );
        let chatrooms = Arc::new(ChatroomService::new(
            Arc::clone(&storage),
            limiter.clone(),
            cache,
            &config.limits,
        ));
        let billing = Arc::new(BillingService::new(Arc::clone(&storage), &config.billing));

        Self {
            storage,
            kv,
            responder,
            limiter,
            tasks,
            generator,
            pipeline,
            chatrooms,
            billing,
            queue,
            runner,
        }
    }
}
