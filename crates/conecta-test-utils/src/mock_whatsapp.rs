// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording stand-in for the WhatsApp Cloud API.

use std::sync::Mutex;

use async_trait::async_trait;
use conecta_whatsapp::{SenderCredentials, TemplateMessage, WhatsAppApi, WhatsAppError};

/// Records every template and answers with `wamid.<n>` ids.
#[derive(Default)]
pub struct MockWhatsAppApi {
    sent: Mutex<Vec<(String, TemplateMessage)>>,
    fail_next: Mutex<Option<String>>,
}

impl MockWhatsAppApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next send fails with an API error carrying `message`.
    pub fn fail_next(&self, message: &str) {
        *lock(&self.fail_next) = Some(message.to_string());
    }

    /// (recipient wa_id, message) pairs, oldest first.
    pub fn sent(&self) -> Vec<(String, TemplateMessage)> {
        lock(&self.sent).clone()
    }

    /// Names of the templates sent so far.
    pub fn templates(&self) -> Vec<String> {
        lock(&self.sent).iter().map(|(_, m)| m.name.clone()).collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl WhatsAppApi for MockWhatsAppApi {
    async fn send_template(
        &self,
        _sender: &SenderCredentials,
        to: &str,
        message: &TemplateMessage,
    ) -> Result<String, WhatsAppError> {
        if let Some(message) = lock(&self.fail_next).take() {
            return Err(WhatsAppError::Api {
                status: 400,
                message,
            });
        }
        let mut sent = lock(&self.sent);
        sent.push((to.to_string(), message.clone()));
        Ok(format!("wamid.{}", sent.len()))
    }
}
