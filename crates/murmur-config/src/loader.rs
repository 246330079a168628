// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./murmur.toml` > `~/.config/murmur/murmur.toml` > `/etc/murmur/murmur.toml`
//! with environment variable overrides via `MURMUR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MurmurConfig;

/// Config sections addressable from `MURMUR_<SECTION>_<KEY>` variables.
const SECTIONS: &[&str] = &[
    "agent",
    "server",
    "storage",
    "gemini",
    "limits",
    "pipeline",
    "jobs",
    "cache",
    "auth",
    "billing",
    "prometheus",
];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/murmur/murmur.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "murmur.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("murmur/murmur.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/murmur/murmur.toml`
/// 3. `~/.config/murmur/murmur.toml`
/// 4. `./murmur.toml`
/// 5. `MURMUR_*` environment variables
pub fn load_config() -> Result<MurmurConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<MurmurConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MurmurConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MurmurConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MurmurConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MurmurConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Maps `MURMUR_GEMINI_API_KEY` to `gemini.api_key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("MURMUR_").map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        section_key(&key).unwrap_or(key).into()
    })
}

/// Splits a lowercased env key at the first underscore following a known
/// section name.
fn section_key(key: &str) -> Option<String> {
    SECTIONS.iter().find_map(|section| {
        key.strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            .map(|rest| format!("{section}.{rest}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[server]
port = 9100

[limits]
basic_daily_messages = 20
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.limits.basic_daily_messages, 20);
        assert_eq!(config.limits.basic_max_chatrooms, 3);
    }

    #[test]
    fn env_keys_split_at_section() {
        assert_eq!(
            section_key("auth_jwt_secret").as_deref(),
            Some("auth.jwt_secret")
        );
        assert_eq!(
            section_key("limits_basic_daily_messages").as_deref(),
            Some("limits.basic_daily_messages")
        );
        assert_eq!(section_key("nonsense_key"), None);
    }

    #[test]
    fn file_path_loading() {
        let dir = std::env::temp_dir().join(format!("murmur-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("murmur.toml");
        std::fs::write(&path, "[storage]\ndatabase_path = \"/tmp/m.db\"\n").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.storage.database_path, "/tmp/m.db");

        std::fs::remove_dir_all(&dir).ok();
    }
}
