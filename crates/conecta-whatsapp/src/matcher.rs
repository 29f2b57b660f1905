// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Picks which notification config fires for an order event.

use conecta_core::{NotificationConditions, NotificationConfig};

/// The order facts a config is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderFacts<'a> {
    pub status: &'a str,
    pub payment_method_id: Option<i64>,
    pub source_integration_id: Option<i64>,
}

/// Whether `conditions` accept `order`.
///
/// Empty lists and an absent source integration match anything.
pub fn matches(conditions: &NotificationConditions, order: &OrderFacts<'_>) -> bool {
    if let Some(source) = conditions.source_integration_id {
        if order.source_integration_id != Some(source) {
            return false;
        }
    }
    if !conditions.statuses.is_empty() && !conditions.statuses.iter().any(|s| s == order.status) {
        return false;
    }
    if !conditions.payment_methods.is_empty() {
        return order
            .payment_method_id
            .is_some_and(|pm| conditions.payment_methods.contains(&pm));
    }
    true
}

/// Highest-priority active config whose conditions accept `order`.
///
/// Equal priorities keep the order of `configs`.
pub fn first_match<'c>(
    configs: &'c [NotificationConfig],
    order: &OrderFacts<'_>,
) -> Option<&'c NotificationConfig> {
    let mut ranked: Vec<&NotificationConfig> = configs.iter().filter(|c| c.is_active).collect();
    ranked.sort_by(|a, b| b.priority.cmp(&a.priority));
    ranked.into_iter().find(|c| matches(&c.conditions, order))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use conecta_core::NotificationTemplate;

    use super::*;

    fn config(id: i64, priority: i64, conditions: NotificationConditions) -> NotificationConfig {
        NotificationConfig {
            id,
            integration_id: 42,
            notification_type: "whatsapp".into(),
            is_active: true,
            priority,
            conditions,
            config: NotificationTemplate {
                template_name: format!("t{id}"),
                language: "es".into(),
                recipient_type: "customer".into(),
            },
            created_at: Utc::now(),
        }
    }

    fn paid() -> OrderFacts<'static> {
        OrderFacts {
            status: "paid",
            payment_method_id: Some(3),
            source_integration_id: Some(1),
        }
    }

    #[test]
    fn empty_conditions_match_anything() {
        assert!(matches(&NotificationConditions::default(), &paid()));
    }

    #[test]
    fn each_predicate_can_reject() {
        let wrong_source = NotificationConditions {
            source_integration_id: Some(2),
            ..Default::default()
        };
        let wrong_status = NotificationConditions {
            statuses: vec!["shipped".into()],
            ..Default::default()
        };
        let wrong_method = NotificationConditions {
            payment_methods: vec![4, 5],
            ..Default::default()
        };
        assert!(!matches(&wrong_source, &paid()));
        assert!(!matches(&wrong_status, &paid()));
        assert!(!matches(&wrong_method, &paid()));

        let no_method = OrderFacts {
            payment_method_id: None,
            ..paid()
        };
        let needs_3 = NotificationConditions {
            payment_methods: vec![3],
            ..Default::default()
        };
        assert!(matches(&needs_3, &paid()));
        assert!(!matches(&needs_3, &no_method));
    }

    #[test]
    fn source_bound_config_rejects_unknown_source() {
        let bound = NotificationConditions {
            source_integration_id: Some(1),
            ..Default::default()
        };
        let unknown = OrderFacts {
            source_integration_id: None,
            ..paid()
        };
        assert!(!matches(&bound, &unknown));
    }

    #[test]
    fn priority_then_insertion_order() {
        let specific = NotificationConditions {
            trigger: "order.status_changed".into(),
            statuses: vec!["paid".into()],
            payment_methods: vec![3],
            source_integration_id: Some(1),
        };
        let configs = vec![
            config(2, 5, NotificationConditions::default()),
            config(1, 10, specific),
            config(3, 5, NotificationConditions::default()),
        ];
        assert_eq!(first_match(&configs, &paid()).map(|c| c.id), Some(1));

        let other = OrderFacts {
            status: "shipped",
            ..paid()
        };
        assert_eq!(first_match(&configs, &other).map(|c| c.id), Some(2));
    }

    #[test]
    fn inactive_configs_never_fire() {
        let mut only = config(9, 100, NotificationConditions::default());
        only.is_active = false;
        assert!(first_match(&[only], &paid()).is_none());
    }
}
