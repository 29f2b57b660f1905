// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sends template messages and keeps the conversation record in step.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use conecta_core::{
    ConectaError, Conversation, MessageDirection, MessageLog, MessageStatus, Storage,
};
use conecta_vault::CredentialSource;
use tracing::{debug, info, warn};

use crate::client::{SenderCredentials, WhatsAppApi};
use crate::phone;
use crate::templates::TemplateCatalog;

/// Integration-type code WhatsApp credentials are stored under.
pub const WHATSAPP_PROVIDER_CODE: &str = "whatsapp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub business_id: i64,
    pub phone: String,
    pub order_number: String,
    pub template_name: String,
    pub language: Option<String>,
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendReceipt {
    pub message_id: String,
    /// The conversation the message belongs to, as it was before sending.
    pub conversation: Conversation,
}

pub struct Dispatcher {
    storage: Arc<dyn Storage>,
    credentials: Arc<dyn CredentialSource>,
    api: Arc<dyn WhatsAppApi>,
    catalog: TemplateCatalog,
    window: Duration,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<dyn Storage>,
        credentials: Arc<dyn CredentialSource>,
        api: Arc<dyn WhatsAppApi>,
        catalog: TemplateCatalog,
        window: Duration,
    ) -> Self {
        Self {
            storage,
            credentials,
            api,
            catalog,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Sends in the open conversation for (phone, order), starting one if needed.
    pub async fn send(&self, request: &SendRequest) -> Result<SendReceipt, ConectaError> {
        let message = self.catalog.render(
            &request.template_name,
            request.language.as_deref(),
            &request.variables,
        )?;
        let phone = phone::parse(&request.phone)?;
        let sender = self.sender(request.business_id).await?;
        let conversation = self
            .open_conversation(&phone.e164(), &request.order_number, request.business_id)
            .await?;
        self.deliver(&sender, &phone.wa_id(), conversation, &message).await
    }

    /// Sends within a known conversation, e.g. a reply to an inbound message.
    pub async fn send_in(
        &self,
        conversation: Conversation,
        template_name: &str,
        variables: &HashMap<String, String>,
    ) -> Result<SendReceipt, ConectaError> {
        let message = self.catalog.render(template_name, None, variables)?;
        let phone = phone::parse(&conversation.phone_number)?;
        let sender = self.sender(conversation.business_id).await?;
        self.deliver(&sender, &phone.wa_id(), conversation, &message).await
    }

    async fn sender(&self, business_id: i64) -> Result<SenderCredentials, ConectaError> {
        let creds = self
            .credentials
            .require(business_id, WHATSAPP_PROVIDER_CODE)
            .await?;
        SenderCredentials::from_credentials(&creds)
    }

    /// Latest conversation for (phone, order) if it can still take messages.
    async fn open_conversation(
        &self,
        phone: &str,
        order_number: &str,
        business_id: i64,
    ) -> Result<Conversation, ConectaError> {
        let now = Utc::now();
        if let Some(existing) = self
            .storage
            .get_conversation_by_phone_and_order(phone, order_number)
            .await?
        {
            if existing.accepts_messages(now) {
                return Ok(existing);
            }
            debug!(conversation_id = %existing.id, "previous conversation closed, starting a new one");
        }
        let conversation = Conversation::start(
            uuid::Uuid::new_v4().to_string(),
            phone,
            order_number,
            business_id,
            now,
            self.window,
        );
        self.storage.insert_conversation(&conversation).await?;
        info!(conversation_id = %conversation.id, business_id, order_number, "conversation started");
        Ok(conversation)
    }

    async fn deliver(
        &self,
        sender: &SenderCredentials,
        to: &str,
        conversation: Conversation,
        message: &crate::templates::TemplateMessage,
    ) -> Result<SendReceipt, ConectaError> {
        let message_id = self.api.send_template(sender, to, message).await?;
        info!(
            conversation_id = %conversation.id,
            business_id = conversation.business_id,
            template = %message.name,
            message_id = %message_id,
            "WhatsApp template sent"
        );

        // The message is out; bookkeeping failures are only logged.
        let log = MessageLog {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            direction: MessageDirection::Outbound,
            message_id: message_id.clone(),
            template_name: Some(message.name.clone()),
            content: serde_json::to_string(&message.body_params).unwrap_or_default(),
            status: MessageStatus::Sent,
            delivered_at: None,
            read_at: None,
            created_at: Utc::now(),
        };
        if let Err(e) = self.storage.insert_message_log(&log).await {
            warn!(conversation_id = %conversation.id, message_id = %message_id, error = %e, "failed to log outbound message");
        }
        if let Err(e) = self
            .storage
            .record_outbound_message(&conversation.id, &message_id, &message.name)
            .await
        {
            warn!(conversation_id = %conversation.id, message_id = %message_id, error = %e, "failed to update conversation");
        }

        Ok(SendReceipt {
            message_id,
            conversation,
        })
    }
}
