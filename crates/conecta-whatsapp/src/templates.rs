// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog of approved message templates.
//!
//! Templates live in the provider account; the catalog only records which
//! body variables each one needs and in which order. Quick-reply buttons
//! are part of the provider template and are never sent from here.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::WhatsAppError;

pub const PEDIDO_CONFIRMADO: &str = "pedido_confirmado";
pub const MENU_NO_CONFIRMACION: &str = "menu_no_confirmacion";
pub const CONFIRMAR_CANCELACION_PEDIDO: &str = "confirmar_cancelacion_pedido";
pub const MOTIVO_CANCELACION: &str = "motivo_cancelacion";
pub const PEDIDO_CANCELADO: &str = "pedido_cancelado";
pub const TIPO_NOVEDAD_PEDIDO: &str = "tipo_novedad_pedido";
pub const NOVEDAD_REGISTRADA: &str = "novedad_registrada";
pub const ASESOR_HUMANO: &str = "asesor_humano";
pub const PAGADO_CONFIRMADO: &str = "pagado_confirmado";
pub const GENERICO: &str = "generico";
pub const CONFIRMACION_CONTRAENTREGA: &str = "confirmacion_pedido_contraentrega";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDef {
    pub name: &'static str,
    pub language: &'static str,
    /// Body variables, in positional order `{{1}}`, `{{2}}`, ...
    pub variables: &'static [&'static str],
    /// Quick-reply labels defined on the provider side.
    pub buttons: &'static [&'static str],
}

/// A template resolved against concrete variables, ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateMessage {
    pub name: String,
    pub language: String,
    pub body_params: Vec<String>,
}

const DEFAULT_TEMPLATES: &[TemplateDef] = &[
    TemplateDef {
        name: CONFIRMACION_CONTRAENTREGA,
        language: "es",
        variables: &["customer_name", "order_number", "total"],
        buttons: &["Confirmar pedido", "No confirmar"],
    },
    TemplateDef {
        name: PEDIDO_CONFIRMADO,
        language: "es",
        variables: &["customer_name", "order_number"],
        buttons: &[],
    },
    TemplateDef {
        name: MENU_NO_CONFIRMACION,
        language: "es",
        variables: &[],
        buttons: &["Presentar novedad", "Cancelar pedido", "Asesor"],
    },
    TemplateDef {
        name: CONFIRMAR_CANCELACION_PEDIDO,
        language: "es",
        variables: &["order_number"],
        buttons: &["Sí, cancelar", "No, volver"],
    },
    TemplateDef {
        name: MOTIVO_CANCELACION,
        language: "es",
        variables: &[],
        buttons: &[],
    },
    TemplateDef {
        name: PEDIDO_CANCELADO,
        language: "es",
        variables: &["order_number"],
        buttons: &[],
    },
    TemplateDef {
        name: TIPO_NOVEDAD_PEDIDO,
        language: "es",
        variables: &[],
        buttons: &["Cambiar dirección", "Cambiar fecha de entrega", "Otra novedad"],
    },
    TemplateDef {
        name: NOVEDAD_REGISTRADA,
        language: "es",
        variables: &["order_number"],
        buttons: &[],
    },
    TemplateDef {
        name: ASESOR_HUMANO,
        language: "es",
        variables: &[],
        buttons: &[],
    },
    TemplateDef {
        name: PAGADO_CONFIRMADO,
        language: "es",
        variables: &["customer_name", "order_number", "total"],
        buttons: &[],
    },
    TemplateDef {
        name: GENERICO,
        language: "es",
        variables: &["customer_name", "order_number"],
        buttons: &[],
    },
];

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: HashMap<&'static str, TemplateDef>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATES.iter().cloned())
    }
}

impl TemplateCatalog {
    pub fn new(templates: impl IntoIterator<Item = TemplateDef>) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.name, t)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TemplateDef> {
        self.templates.get(name)
    }

    /// Resolves `name` with `variables`, in the template's positional order.
    ///
    /// `language` overrides the catalog default when given.
    pub fn render(
        &self,
        name: &str,
        language: Option<&str>,
        variables: &HashMap<String, String>,
    ) -> Result<TemplateMessage, WhatsAppError> {
        let def = self
            .get(name)
            .ok_or_else(|| WhatsAppError::TemplateNotFound(name.to_string()))?;
        let body_params = def
            .variables
            .iter()
            .map(|var| {
                variables
                    .get(*var)
                    .filter(|v| !v.trim().is_empty())
                    .cloned()
                    .ok_or_else(|| WhatsAppError::MissingVariable {
                        template: name.to_string(),
                        variable: (*var).to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TemplateMessage {
            name: def.name.to_string(),
            language: language
                .filter(|l| !l.is_empty())
                .unwrap_or(def.language)
                .to_string(),
            body_params,
        })
    }
}

/// Formats an amount the way Colombian customers read it, e.g. `$85.000 COP`.
pub fn format_amount(amount: f64, currency: &str) -> String {
    let whole = amount.trunc() as i64;
    let cents = ((amount - amount.trunc()).abs() * 100.0).round() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let sign = if whole < 0 { "-" } else { "" };
    let mut out = format!("{sign}${grouped}");
    if cents > 0 {
        out.push_str(&format!(",{cents:02}"));
    }
    if !currency.is_empty() {
        out.push(' ');
        out.push_str(currency);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn body_params_follow_declared_order() {
        let catalog = TemplateCatalog::default();
        let msg = catalog
            .render(
                PAGADO_CONFIRMADO,
                None,
                &vars(&[("total", "$85.000 COP"), ("order_number", "1001"), ("customer_name", "Ana")]),
            )
            .unwrap();
        assert_eq!(msg.body_params, vec!["Ana", "1001", "$85.000 COP"]);
        assert_eq!(msg.language, "es");
    }

    #[test]
    fn unknown_template_and_missing_variable() {
        let catalog = TemplateCatalog::default();
        assert!(matches!(
            catalog.render("nope", None, &HashMap::new()),
            Err(WhatsAppError::TemplateNotFound(_))
        ));
        let err = catalog
            .render(PEDIDO_CANCELADO, None, &vars(&[("order_number", " ")]))
            .unwrap_err();
        assert!(matches!(err, WhatsAppError::MissingVariable { ref variable, .. } if variable == "order_number"));
    }

    #[test]
    fn buttons_are_not_rendered() {
        let catalog = TemplateCatalog::default();
        let msg = catalog.render(MENU_NO_CONFIRMACION, Some("es_CO"), &HashMap::new()).unwrap();
        assert!(msg.body_params.is_empty());
        assert_eq!(msg.language, "es_CO");
        assert_eq!(catalog.get(MENU_NO_CONFIRMACION).unwrap().buttons.len(), 3);
    }

    #[test]
    fn amounts_use_dot_grouping() {
        assert_eq!(format_amount(85000.0, "COP"), "$85.000 COP");
        assert_eq!(format_amount(1234567.5, "COP"), "$1.234.567,50 COP");
        assert_eq!(format_amount(999.0, ""), "$999");
    }
}
