// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Conecta backend.
//!
//! TOML files layered over compiled defaults, overridable with `CONECTA_*`
//! environment variables, validated after deserialization and rendered as
//! miette diagnostics on failure.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ConectaConfig;

/// Loads from the standard locations and validates.
pub fn load_and_validate() -> Result<ConectaConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &read_sources(&[loader::SYSTEM_CONFIG_PATH, loader::LOCAL_CONFIG_PATH]),
        )),
    }
}

/// Loads an explicit file (plus env overrides) and validates.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<ConectaConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let display = path.display().to_string();
            Err(diagnostic::figment_to_config_errors(
                err,
                &read_sources(&[display.as_str()]),
            ))
        }
    }
}

/// Loads an inline TOML string and validates.
pub fn load_and_validate_str(toml_content: &str) -> Result<ConectaConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn read_sources(paths: &[&str]) -> Vec<(String, String)> {
    paths
        .iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(path).ok()?;
            let absolute = std::fs::canonicalize(path)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| path.to_string());
            Some((absolute, content))
        })
        .collect()
}
