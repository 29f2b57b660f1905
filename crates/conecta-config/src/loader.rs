// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-based configuration loading.
//!
//! Merge order, later wins: compiled defaults, `/etc/conecta/conecta.toml`,
//! `./conecta.toml`, then `CONECTA_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ConectaConfig;

pub const SYSTEM_CONFIG_PATH: &str = "/etc/conecta/conecta.toml";
pub const LOCAL_CONFIG_PATH: &str = "conecta.toml";

/// Top-level sections, used to turn `CONECTA_SECTION_KEY` into `section.key`.
const SECTIONS: &[&str] = &[
    "server",
    "storage",
    "broker",
    "redis",
    "vault",
    "transport",
    "whatsapp",
    "payments",
    "logging",
];

/// Load configuration from the standard locations with env overrides.
pub fn load_config() -> Result<ConectaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<ConectaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConectaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<ConectaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConectaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ConectaConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// `CONECTA_*` provider. Only the first underscore after a known section
/// name becomes a dot, so `CONECTA_TRANSPORT_QUOTE_TIMEOUT_SECS` lands on
/// `transport.quote_timeout_secs`.
fn env_provider() -> Env {
    Env::prefixed("CONECTA_").map(|key| map_env_key(key.as_str()).into())
}

/// Env var names keep their case, config keys are lowercase.
fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(
            map_env_key("TRANSPORT_QUOTE_TIMEOUT_SECS"),
            "transport.quote_timeout_secs"
        );
        assert_eq!(
            map_env_key("VAULT_ENCRYPTION_KEY"),
            "vault.encryption_key"
        );
        assert_eq!(
            map_env_key("whatsapp_conversation_window_hours"),
            "whatsapp.conversation_window_hours"
        );
        assert_eq!(map_env_key("UNRELATED"), "unrelated");
    }
}
