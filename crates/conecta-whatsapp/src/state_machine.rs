// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order-confirmation dialogue as a pure transition function.
//!
//! [`transition`] only decides. Persisting the new state, sending the
//! reply template and publishing the outcome are done by the caller.

use conecta_core::ConversationState;
use serde::{Deserialize, Serialize};

use crate::error::WhatsAppError;
use crate::templates;

pub const CONFIRM: &str = "Confirmar pedido";
pub const DO_NOT_CONFIRM: &str = "No confirmar";
pub const REPORT_NOVELTY: &str = "Presentar novedad";
pub const CANCEL_ORDER: &str = "Cancelar pedido";
pub const AGENT: &str = "Asesor";
pub const YES_CANCEL: &str = "Sí, cancelar";
pub const NO_GO_BACK: &str = "No, volver";

/// Options offered by `tipo_novedad_pedido`.
pub const NOVELTY_TYPES: &[&str] = &["Cambiar dirección", "Cambiar fecha de entrega", "Otra novedad"];

/// Domain outcome of a finished conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Confirmed,
    Handoff,
    Novelty { novelty_type: String },
    Cancelled { cancellation_reason: String },
}

impl Outcome {
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Confirmed => "confirmed",
            Outcome::Handoff => "handoff",
            Outcome::Novelty { .. } => "novelty",
            Outcome::Cancelled { .. } => "cancelled",
        }
    }

    /// Entries merged into the conversation metadata.
    pub fn metadata(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![("outcome", self.name().to_string())];
        match self {
            Outcome::Novelty { novelty_type } => entries.push(("novelty_type", novelty_type.clone())),
            Outcome::Cancelled {
                cancellation_reason,
            } => entries.push(("cancellation_reason", cancellation_reason.clone())),
            Outcome::Confirmed | Outcome::Handoff => {}
        }
        entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: ConversationState,
    pub to: ConversationState,
    /// Template to answer with.
    pub reply_template: &'static str,
    pub outcome: Option<Outcome>,
}

/// The first outbound template moves a fresh conversation into the dialogue.
pub fn on_initial_send(state: ConversationState) -> Option<ConversationState> {
    (state == ConversationState::Start).then_some(ConversationState::AwaitingConfirmation)
}

/// Case, accent and surrounding-whitespace insensitive comparison key.
fn fold(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

fn is(input: &str, option: &str) -> bool {
    fold(input) == fold(option)
}

pub fn transition(state: ConversationState, input: &str) -> Result<Transition, WhatsAppError> {
    use conecta_core::ConversationState::*;

    let step = |to, reply_template, outcome| {
        Ok(Transition {
            from: state,
            to,
            reply_template,
            outcome,
        })
    };

    match state {
        AwaitingConfirmation if is(input, CONFIRM) => {
            step(Completed, templates::PEDIDO_CONFIRMADO, Some(Outcome::Confirmed))
        }
        AwaitingConfirmation if is(input, DO_NOT_CONFIRM) => {
            step(AwaitingMenuSelection, templates::MENU_NO_CONFIRMACION, None)
        }
        AwaitingMenuSelection if is(input, REPORT_NOVELTY) => {
            step(AwaitingNoveltyType, templates::TIPO_NOVEDAD_PEDIDO, None)
        }
        AwaitingMenuSelection if is(input, CANCEL_ORDER) => {
            step(AwaitingCancelConfirm, templates::CONFIRMAR_CANCELACION_PEDIDO, None)
        }
        AwaitingMenuSelection if is(input, AGENT) => {
            step(HandoffToHuman, templates::ASESOR_HUMANO, Some(Outcome::Handoff))
        }
        AwaitingNoveltyType => match NOVELTY_TYPES.iter().find(|option| is(input, option)) {
            Some(option) => step(
                Completed,
                templates::NOVEDAD_REGISTRADA,
                Some(Outcome::Novelty {
                    novelty_type: (*option).to_string(),
                }),
            ),
            None => Err(invalid(state, input)),
        },
        AwaitingCancelConfirm if is(input, YES_CANCEL) => {
            step(AwaitingCancelReason, templates::MOTIVO_CANCELACION, None)
        }
        AwaitingCancelConfirm if is(input, NO_GO_BACK) => {
            step(AwaitingMenuSelection, templates::MENU_NO_CONFIRMACION, None)
        }
        AwaitingCancelReason if !input.trim().is_empty() => step(
            Completed,
            templates::PEDIDO_CANCELADO,
            Some(Outcome::Cancelled {
                cancellation_reason: input.trim().to_string(),
            }),
        ),
        _ => Err(invalid(state, input)),
    }
}

fn invalid(state: ConversationState, input: &str) -> WhatsAppError {
    WhatsAppError::InvalidStateTransition {
        state,
        input: input.to_string(),
    }
}
