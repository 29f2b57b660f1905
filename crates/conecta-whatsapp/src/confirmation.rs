// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conecta_bus::MessageHandler;
use conecta_core::{ConectaError, Storage};
use serde_json::Value;
use tracing::{debug, warn};

use crate::dispatcher::{Dispatcher, SendReceipt, SendRequest};
use crate::events::ConfirmationRequest;
use crate::state_machine::on_initial_send;
use crate::templates::format_amount;

/// Consumes `orders.confirmation.requested` and sends the matched template.
pub struct ConfirmationConsumer {
    dispatcher: Arc<Dispatcher>,
    storage: Arc<dyn Storage>,
}

impl ConfirmationConsumer {
    pub fn new(dispatcher: Arc<Dispatcher>, storage: Arc<dyn Storage>) -> Self {
        Self {
            dispatcher,
            storage,
        }
    }

    /// Sends the notification and opens the dialogue on the first message.
    pub async fn process(&self, request: &ConfirmationRequest) -> Result<SendReceipt, ConectaError> {
        let variables: HashMap<String, String> = [
            ("customer_name", request.customer_name.clone()),
            ("order_number", request.order_number.clone()),
            ("total", format_amount(request.total, &request.currency)),
            ("currency", request.currency.clone()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let receipt = self
            .dispatcher
            .send(&SendRequest {
                business_id: request.business_id,
                phone: request.phone.clone(),
                order_number: request.order_number.clone(),
                template_name: request.template_name.clone(),
                language: Some(request.language.clone()),
                variables,
            })
            .await?;

        let conversation = &receipt.conversation;
        if let Some(next) = on_initial_send(conversation.current_state) {
            let mut metadata = conversation.metadata.clone();
            metadata.insert("order_id".into(), Value::String(request.order_id.clone()));
            metadata.insert("customer_name".into(), Value::String(request.customer_name.clone()));
            metadata.insert("initial_template".into(), Value::String(request.template_name.clone()));
            if let Err(e) = self
                .storage
                .update_conversation_state(&conversation.id, conversation.current_state, next, &metadata)
                .await
            {
                warn!(conversation_id = %conversation.id, error = %e, "failed to open conversation dialogue");
            } else {
                debug!(conversation_id = %conversation.id, state = %next, "conversation awaiting confirmation");
            }
        }
        Ok(receipt)
    }
}

#[async_trait]
impl MessageHandler for ConfirmationConsumer {
    async fn handle(&self, payload: &[u8]) -> Result<(), ConectaError> {
        let request: ConfirmationRequest = match serde_json::from_slice(payload) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "dropping malformed confirmation request");
                return Ok(());
            }
        };
        // Failed sends are reported, not redelivered.
        if let Err(e) = self.process(&request).await {
            warn!(
                business_id = request.business_id,
                order_id = %request.order_id,
                template = %request.template_name,
                error = %e,
                "confirmation message not sent"
            );
        }
        Ok(())
    }
}
