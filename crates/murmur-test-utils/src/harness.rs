// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete service graph over a temp SQLite
//! database and an in-memory key-value store, with a [`MockProvider`] as the
//! AI backend unless the builder is told otherwise.

use std::sync::Arc;

use murmur_agent::{SubmitOutcome, Services};
use murmur_config::model::{
    BillingConfig, DeliveryMode, JobsConfig, LimitsConfig, MurmurConfig, StorageConfig,
};
use murmur_core::types::{Chatroom, ChatroomId, Principal, SubscriptionTier};
use murmur_core::{KvStore, MurmurError, ProviderAdapter, StorageAdapter};
use murmur_kv::MemoryKv;
use murmur_storage::SqliteStorage;

use crate::mock_provider::MockProvider;
use crate::storage::RejectingReplyStorage;

enum ProviderChoice {
    Mock(Vec<String>),
    Custom(Arc<dyn ProviderAdapter>),
    None,
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    provider: ProviderChoice,
    config: MurmurConfig,
    kv: Option<Arc<dyn KvStore>>,
    reject_ai_replies: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = MurmurConfig::default();
        config.agent.system_prompt = "You are a test assistant.".to_string();
        Self {
            provider: ProviderChoice::Mock(Vec::new()),
            config,
            kv: None,
            reject_ai_replies: false,
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.provider = ProviderChoice::Mock(responses);
        self
    }

    /// Use `provider` as the AI backend instead of a [`MockProvider`].
    pub fn with_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.provider = ProviderChoice::Custom(provider);
        self
    }

    /// Run the responder without a backend, answering from the canned table.
    pub fn without_provider(mut self) -> Self {
        self.provider = ProviderChoice::None;
        self
    }

    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.config.pipeline.delivery_mode = mode;
        self
    }

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn with_jobs(mut self, jobs: JobsConfig) -> Self {
        self.config.jobs = jobs;
        self
    }

    pub fn with_billing(mut self, billing: BillingConfig) -> Self {
        self.config.billing = billing;
        self
    }

    pub fn with_enforced_safety(mut self) -> Self {
        self.config.pipeline.enforce_safety = true;
        self
    }

    /// Use `kv` instead of a fresh [`MemoryKv`].
    pub fn with_kv(mut self, kv: Arc<dyn KvStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    /// Wrap storage in a [`RejectingReplyStorage`], so no AI reply or
    /// apology can be stored.
    pub fn with_rejected_ai_replies(mut self) -> Self {
        self.reject_ai_replies = true;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, MurmurError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(MurmurError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let mut storage: Arc<dyn StorageAdapter> = Arc::new(storage);
        if self.reject_ai_replies {
            storage = Arc::new(RejectingReplyStorage::new(storage));
        }
        let kv = self.kv.unwrap_or_else(|| Arc::new(MemoryKv::new()));

        let (mock_provider, provider) = match self.provider {
            ProviderChoice::Mock(responses) => {
                let mock = Arc::new(MockProvider::with_responses(responses));
                let provider: Arc<dyn ProviderAdapter> = mock.clone();
                (mock, Some(provider))
            }
            ProviderChoice::Custom(provider) => (Arc::new(MockProvider::new()), Some(provider)),
            ProviderChoice::None => (Arc::new(MockProvider::new()), None),
        };

        let services = Services::assemble(&config, storage, kv, provider);

        Ok(TestHarness {
            mock_provider,
            services,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock AI backend and temp storage.
pub struct TestHarness {
    /// The mock AI backend. Never called when the builder chose another
    /// provider or none.
    pub mock_provider: Arc<MockProvider>,
    /// The assembled services.
    pub services: Services,
    /// Effective configuration, including the temp database path.
    pub config: MurmurConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.services.storage
    }

    /// Registers a Basic-tier user.
    pub async fn create_user(&self, mobile_number: &str) -> Result<Principal, MurmurError> {
        let user = self.storage().create_user(mobile_number).await?;
        Ok(Principal::from(&user))
    }

    /// Registers a Pro-tier user.
    pub async fn create_pro_user(&self, mobile_number: &str) -> Result<Principal, MurmurError> {
        let mut principal = self.create_user(mobile_number).await?;
        self.storage()
            .set_subscription_tier(principal.user_id, SubscriptionTier::Pro)
            .await?;
        principal.tier = SubscriptionTier::Pro;
        Ok(principal)
    }

    pub async fn create_chatroom(
        &self,
        principal: &Principal,
        name: &str,
    ) -> Result<Chatroom, MurmurError> {
        self.services.chatrooms.create(principal, name, None).await
    }

    /// Submits `text` through the message pipeline.
    pub async fn send_message(
        &self,
        principal: &Principal,
        chatroom_id: ChatroomId,
        text: &str,
    ) -> Result<SubmitOutcome, MurmurError> {
        self.services.pipeline.submit(principal, chatroom_id, text).await
    }

    /// Processes queued jobs until the queue has nothing available.
    /// Returns the number of jobs processed.
    pub async fn drain_jobs(&self) -> Result<usize, MurmurError> {
        let mut processed = 0;
        while self.services.runner.run_once().await? {
            processed += 1;
        }
        Ok(processed)
    }
}
