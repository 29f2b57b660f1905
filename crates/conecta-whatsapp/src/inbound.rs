// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer replies and delivery statuses coming back from WhatsApp.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use conecta_bus::queues::CONVERSATION_OUTCOMES;
use conecta_bus::{Broker, publish_json};
use conecta_core::{
    ConectaError, Conversation, ConversationState, MessageDirection, MessageLog, MessageStatus,
    Storage,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::WhatsAppError;
use crate::events::ConversationOutcome;
use crate::phone;
use crate::state_machine::{Outcome, transition};

/// A text or button reply from a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: String,
    pub from: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    /// The provider delivered this message before.
    Duplicate,
    /// No conversation exists for the sender.
    NoConversation,
    /// The previous conversation was closed; a fresh one was started.
    Restarted { conversation_id: String },
    /// The input is not an option in the current state.
    Rejected {
        conversation_id: String,
        state: ConversationState,
    },
    Advanced {
        conversation_id: String,
        from: ConversationState,
        to: ConversationState,
        outcome: Option<Outcome>,
    },
}

pub struct InboundHandler {
    storage: Arc<dyn Storage>,
    dispatcher: Arc<Dispatcher>,
    broker: Arc<dyn Broker>,
}

impl InboundHandler {
    pub fn new(storage: Arc<dyn Storage>, dispatcher: Arc<Dispatcher>, broker: Arc<dyn Broker>) -> Self {
        Self {
            storage,
            dispatcher,
            broker,
        }
    }

    /// Advances the sender's conversation with `message`.
    ///
    /// State is read from storage on entry and persisted before the reply
    /// template is sent and before any outcome is published.
    pub async fn handle_reply(&self, message: &InboundMessage) -> Result<ReplyOutcome, ConectaError> {
        let phone = phone::parse(&message.from)?.e164();
        if self
            .storage
            .get_message_log_by_message_id(&message.message_id)
            .await?
            .is_some()
        {
            debug!(message_id = %message.message_id, "duplicate inbound message");
            return Ok(ReplyOutcome::Duplicate);
        }

        let Some(mut conversation) = self.storage.latest_conversation_for_phone(&phone).await? else {
            debug!(message_id = %message.message_id, "inbound message without conversation");
            return Ok(ReplyOutcome::NoConversation);
        };

        let now = Utc::now();
        if !conversation.accepts_messages(now) {
            let fresh = Conversation::start(
                uuid::Uuid::new_v4().to_string(),
                &phone,
                &conversation.order_number,
                conversation.business_id,
                now,
                self.dispatcher.window(),
            );
            self.storage.insert_conversation(&fresh).await?;
            self.log_inbound(&fresh.id, message).await?;
            info!(
                previous = %conversation.id,
                conversation_id = %fresh.id,
                "closed conversation received a message, started a new one"
            );
            return Ok(ReplyOutcome::Restarted {
                conversation_id: fresh.id,
            });
        }

        self.log_inbound(&conversation.id, message).await?;

        let step = match transition(conversation.current_state, &message.text) {
            Ok(step) => step,
            Err(WhatsAppError::InvalidStateTransition { state, .. }) => {
                debug!(conversation_id = %conversation.id, %state, "reply is not a menu option");
                return Ok(ReplyOutcome::Rejected {
                    conversation_id: conversation.id,
                    state,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut metadata = conversation.metadata.clone();
        if let Some(outcome) = &step.outcome {
            for (key, value) in outcome.metadata() {
                metadata.insert(key.to_string(), Value::String(value));
            }
        }
        let applied = self
            .storage
            .update_conversation_state(&conversation.id, step.from, step.to, &metadata)
            .await?;
        if !applied {
            debug!(conversation_id = %conversation.id, from = %step.from, "conversation moved on concurrently");
            return Ok(ReplyOutcome::Rejected {
                conversation_id: conversation.id,
                state: conversation.current_state,
            });
        }
        info!(
            conversation_id = %conversation.id,
            from = %step.from,
            to = %step.to,
            "conversation advanced"
        );
        conversation.current_state = step.to;
        conversation.metadata = metadata;

        let variables = self.reply_variables(&conversation).await;
        if let Err(e) = self
            .dispatcher
            .send_in(conversation.clone(), step.reply_template, &variables)
            .await
        {
            warn!(conversation_id = %conversation.id, template = step.reply_template, error = %e, "reply not sent");
        }

        if let Some(outcome) = &step.outcome {
            let event = ConversationOutcome {
                conversation_id: conversation.id.clone(),
                business_id: conversation.business_id,
                order_number: conversation.order_number.clone(),
                phone_number: conversation.phone_number.clone(),
                outcome: outcome.clone(),
                timestamp: Utc::now(),
            };
            if let Err(e) = publish_json(self.broker.as_ref(), CONVERSATION_OUTCOMES, &event).await {
                warn!(conversation_id = %conversation.id, outcome = outcome.name(), error = %e, "failed to publish conversation outcome");
            }
        }

        Ok(ReplyOutcome::Advanced {
            conversation_id: conversation.id,
            from: step.from,
            to: step.to,
            outcome: step.outcome,
        })
    }

    /// Applies a delivery status; returns whether the log moved forward.
    pub async fn apply_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, ConectaError> {
        let moved = self.storage.update_message_status(message_id, status, at).await?;
        if !moved {
            debug!(message_id, %status, "status update ignored");
        }
        Ok(moved)
    }

    async fn log_inbound(&self, conversation_id: &str, message: &InboundMessage) -> Result<(), ConectaError> {
        self.storage
            .insert_message_log(&MessageLog {
                id: uuid::Uuid::new_v4().to_string(),
                conversation_id: conversation_id.to_string(),
                direction: MessageDirection::Inbound,
                message_id: message.message_id.clone(),
                template_name: None,
                content: message.text.clone(),
                status: MessageStatus::Delivered,
                delivered_at: Some(message.timestamp),
                read_at: None,
                created_at: message.timestamp,
            })
            .await
    }

    async fn reply_variables(&self, conversation: &Conversation) -> HashMap<String, String> {
        let mut customer_name = conversation
            .metadata
            .get("customer_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        if customer_name.is_none() {
            match self
                .storage
                .get_order_by_number(conversation.business_id, &conversation.order_number)
                .await
            {
                Ok(order) => customer_name = order.map(|o| o.customer_name),
                Err(e) => warn!(conversation_id = %conversation.id, error = %e, "order lookup failed"),
            }
        }
        let mut vars = HashMap::from([("order_number".to_string(), conversation.order_number.clone())]);
        if let Some(name) = customer_name {
            vars.insert("customer_name".into(), name);
        }
        vars
    }
}
