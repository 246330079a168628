// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Murmur chat backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default persona used when no system prompt is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant in a chatroom. \
Provide informative, engaging, and helpful responses. Keep responses concise but comprehensive.";

/// Top-level Murmur configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MurmurConfig {
    /// Process identity, logging, and assistant persona.
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Tier quotas and input size limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Message pipeline behavior.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Background job runner settings.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Key-value cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Token and OTP settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Payment webhook settings.
    #[serde(default)]
    pub billing: BillingConfig,

    /// Prometheus metrics export.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Process identity and assistant persona.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System instruction prepended to every prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_agent_name() -> String {
    "murmur".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow any origin, method, and header (suitable for local clients).
    #[serde(default = "default_true")]
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            cors_permissive: true,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable write-ahead logging.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("murmur").join("murmur.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("murmur.db"))
        .to_string_lossy()
        .into_owned()
}

/// Gemini API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. `None` puts the responder in mock mode.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Per-request timeout for the backend call.
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_gemini_timeout(),
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_gemini_timeout() -> u64 {
    30
}

/// Tier quotas and input size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Messages a Basic-tier user may send per calendar day.
    #[serde(default = "default_basic_daily_messages")]
    pub basic_daily_messages: u32,

    /// Chatrooms a Basic-tier user may own.
    #[serde(default = "default_basic_max_chatrooms")]
    pub basic_max_chatrooms: u32,

    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    #[serde(default = "default_max_chatroom_name_chars")]
    pub max_chatroom_name_chars: usize,

    #[serde(default = "default_max_description_chars")]
    pub max_description_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            basic_daily_messages: default_basic_daily_messages(),
            basic_max_chatrooms: default_basic_max_chatrooms(),
            max_message_chars: default_max_message_chars(),
            max_chatroom_name_chars: default_max_chatroom_name_chars(),
            max_description_chars: default_max_description_chars(),
        }
    }
}

fn default_basic_daily_messages() -> u32 {
    5
}

fn default_basic_max_chatrooms() -> u32 {
    3
}

fn default_max_message_chars() -> usize {
    4000
}

fn default_max_chatroom_name_chars() -> usize {
    100
}

fn default_max_description_chars() -> usize {
    500
}

/// Where AI replies are generated.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Inline, within the submitting request.
    #[default]
    Sync,
    /// In a background job; the request returns a task id.
    Deferred,
}

/// Message pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub delivery_mode: DeliveryMode,

    /// Number of recent completed messages sent to the AI backend.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Reject flagged content instead of only logging it.
    #[serde(default)]
    pub enforce_safety: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delivery_mode: DeliveryMode::default(),
            history_window: default_history_window(),
            enforce_safety: false,
        }
    }
}

fn default_history_window() -> usize {
    10
}

/// Background job runner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    /// Jobs processed concurrently by this process.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Generation is abandoned after this long, leaving time to persist a fallback.
    #[serde(default = "default_soft_time_limit_secs")]
    pub soft_time_limit_secs: u64,

    /// The whole attempt is cancelled after this long.
    #[serde(default = "default_hard_time_limit_secs")]
    pub hard_time_limit_secs: u64,

    /// How long task status records stay pollable.
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,

    /// Idle wait between queue polls when no enqueue wakes the worker.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
            soft_time_limit_secs: default_soft_time_limit_secs(),
            hard_time_limit_secs: default_hard_time_limit_secs(),
            result_ttl_secs: default_result_ttl_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_secs() -> u64 {
    60
}

fn default_soft_time_limit_secs() -> u64 {
    240
}

fn default_hard_time_limit_secs() -> u64 {
    300
}

fn default_result_ttl_secs() -> u64 {
    3600
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Key-value backend selection.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KvBackend {
    /// In-process store with per-entry expiry.
    #[default]
    Memory,
    /// Every operation misses. Caching, OTP, and task status are unavailable.
    Disabled,
}

/// Key-value cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: KvBackend,

    #[serde(default = "default_chatroom_list_ttl_secs")]
    pub chatroom_list_ttl_secs: u64,

    /// Interval of the expired-entry sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: KvBackend::default(),
            chatroom_list_ttl_secs: default_chatroom_list_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_chatroom_list_ttl_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Token and OTP configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 signing secret. Required by `murmur serve`.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default = "default_jwt_expiration_hours")]
    pub jwt_expiration_hours: u64,

    #[serde(default = "default_otp_ttl_secs")]
    pub otp_ttl_secs: u64,

    /// Return issued OTP codes in API responses (no delivery channel exists).
    #[serde(default = "default_true")]
    pub expose_otp: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("otp_ttl_secs", &self.otp_ttl_secs)
            .field("expose_otp", &self.expose_otp)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_hours: default_jwt_expiration_hours(),
            otp_ttl_secs: default_otp_ttl_secs(),
            expose_otp: true,
        }
    }
}

fn default_jwt_expiration_hours() -> u64 {
    24
}

fn default_otp_ttl_secs() -> u64 {
    300
}

/// Payment webhook configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BillingConfig {
    /// Shared secret for `Stripe-Signature` verification. Without it every
    /// webhook call is rejected.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Maximum age of a signed webhook timestamp.
    #[serde(default = "default_signature_tolerance_secs")]
    pub signature_tolerance_secs: u64,

    /// Downgrade users to Basic when their subscription is deleted.
    /// Off by default: cancellation events are only logged.
    #[serde(default)]
    pub downgrade_on_cancel: bool,
}

impl std::fmt::Debug for BillingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingConfig")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("signature_tolerance_secs", &self.signature_tolerance_secs)
            .field("downgrade_on_cancel", &self.downgrade_on_cancel)
            .finish()
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            signature_tolerance_secs: default_signature_tolerance_secs(),
            downgrade_on_cancel: false,
        }
    }
}

fn default_signature_tolerance_secs() -> u64 {
    300
}

/// Prometheus metrics export configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Serve `/metrics` in Prometheus text format.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
