// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use conecta_core::ConectaError;
use serde_json::{Map, Value};

/// A decrypted provider credential map.
///
/// `Debug` prints key names only.
#[derive(Clone, PartialEq)]
pub struct Credentials(Map<String, Value>);

impl Credentials {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// A string value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Like [`get`](Self::get) but missing or empty values are an error.
    pub fn require(&self, key: &str) -> Result<&str, ConectaError> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ConectaError::Credentials(format!(
                "credential `{key}` is missing"
            ))),
        }
    }

    /// `environment = "sandbox"` (or `"test"`) selects provider sandboxes.
    pub fn is_sandbox(&self) -> bool {
        matches!(self.get("environment"), Some("sandbox" | "test"))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}
