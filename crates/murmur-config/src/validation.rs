// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::MurmurConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every problem instead of stopping at the first.
pub fn validate_config(config: &MurmurConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level `{}` must be one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let addr = config.server.bind_address.trim();
    if addr.is_empty() {
        fail("server.bind_address must not be empty".to_string());
    } else if addr.parse::<std::net::IpAddr>().is_err()
        && !addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "server.bind_address `{addr}` is not a valid IP address or hostname"
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.limits.basic_daily_messages == 0 {
        fail("limits.basic_daily_messages must be at least 1".to_string());
    }
    if config.limits.basic_max_chatrooms == 0 {
        fail("limits.basic_max_chatrooms must be at least 1".to_string());
    }
    if config.limits.max_message_chars == 0 {
        fail("limits.max_message_chars must be at least 1".to_string());
    }
    if config.limits.max_chatroom_name_chars == 0 {
        fail("limits.max_chatroom_name_chars must be at least 1".to_string());
    }

    if config.pipeline.history_window == 0 {
        fail("pipeline.history_window must be at least 1".to_string());
    }

    if config.jobs.concurrency == 0 {
        fail("jobs.concurrency must be at least 1".to_string());
    }
    if config.jobs.soft_time_limit_secs >= config.jobs.hard_time_limit_secs {
        fail(format!(
            "jobs.soft_time_limit_secs ({}) must be below jobs.hard_time_limit_secs ({})",
            config.jobs.soft_time_limit_secs, config.jobs.hard_time_limit_secs
        ));
    }
    if config.jobs.result_ttl_secs == 0 {
        fail("jobs.result_ttl_secs must be at least 1".to_string());
    }

    if config.gemini.timeout_secs == 0 {
        fail("gemini.timeout_secs must be at least 1".to_string());
    }
    if let Some(key) = &config.gemini.api_key
        && key.trim().is_empty()
    {
        fail("gemini.api_key must not be blank; omit it to use mock mode".to_string());
    }

    if let Some(secret) = &config.auth.jwt_secret
        && secret.len() < 16
    {
        fail("auth.jwt_secret must be at least 16 bytes".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
