// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::{BrokerKind, ConectaConfig, KNOWN_GATEWAYS};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validates a deserialized configuration, collecting every problem.
pub fn validate_config(config: &ConectaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::validation("server.host", "must not be empty"));
    }
    if config.server.port == 0 {
        errors.push(ConfigError::validation("server.port", "must be non-zero"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path",
            "must not be empty",
        ));
    }

    if config.broker.kind == BrokerKind::Amqp {
        let url = config.broker.url.trim();
        if !(url.starts_with("amqp://") || url.starts_with("amqps://")) {
            errors.push(ConfigError::validation(
                "broker.url",
                format!("`{url}` is not an amqp:// or amqps:// URL"),
            ));
        }
    }
    if config.broker.prefetch == 0 {
        errors.push(ConfigError::validation("broker.prefetch", "must be at least 1"));
    }

    if let Some(url) = &config.redis.url {
        if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
            errors.push(ConfigError::validation(
                "redis.url",
                format!("`{url}` is not a redis:// or rediss:// URL"),
            ));
        }
    }

    if matches!(&config.vault.encryption_key, Some(key) if key.is_empty()) {
        errors.push(ConfigError::validation(
            "vault.encryption_key",
            "must not be empty when set",
        ));
    }

    let transport = &config.transport;
    if transport.quote_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "transport.quote_timeout_secs",
            "must be at least 1",
        ));
    }
    if transport.quote_poll_interval_ms == 0 {
        errors.push(ConfigError::validation(
            "transport.quote_poll_interval_ms",
            "must be at least 1",
        ));
    }
    if transport.result_ttl_secs < transport.quote_timeout_secs {
        errors.push(ConfigError::validation(
            "transport.result_ttl_secs",
            format!(
                "must be at least quote_timeout_secs ({}), got {}",
                transport.quote_timeout_secs, transport.result_ttl_secs
            ),
        ));
    }
    if transport.provider_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "transport.provider_timeout_secs",
            "must be at least 1",
        ));
    }

    if config.whatsapp.conversation_window_hours <= 0 {
        errors.push(ConfigError::validation(
            "whatsapp.conversation_window_hours",
            format!(
                "must be positive, got {}",
                config.whatsapp.conversation_window_hours
            ),
        ));
    }

    for gateway in &config.payments.gateways {
        if !KNOWN_GATEWAYS.contains(&gateway.as_str()) {
            errors.push(ConfigError::validation(
                "payments.gateways",
                format!(
                    "unknown gateway `{gateway}`, expected one of {}",
                    KNOWN_GATEWAYS.join(", ")
                ),
            ));
        }
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::validation(
            "logging.level",
            format!("`{}` is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
