// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seed data for scenario tests.

use chrono::Utc;
use conecta_core::{
    BusinessRepository, ConectaError, Integration, IntegrationCategory, IntegrationRepository,
    IntegrationType, NewIntegration, NewNotificationConfig, NotificationConditions,
    NotificationTemplate, Order, OriginAddressInput,
};
use conecta_vault::CredentialVault;
use serde_json::{Map, Value, json};

pub const SHIPPING_BASE_URL: &str = "https://api.provider/";
pub const SHIPPING_BASE_URL_TEST: &str = "https://sandbox.provider/";

pub async fn business(storage: &dyn BusinessRepository, name: &str) -> Result<i64, ConectaError> {
    Ok(storage.insert_business(name).await?.id)
}

/// The catalog entry for `code`, inserted on first use.
pub async fn integration_type(
    storage: &dyn IntegrationRepository,
    code: &str,
    category: IntegrationCategory,
) -> Result<i64, ConectaError> {
    if let Some(existing) = storage.get_integration_type_by_code(code).await? {
        return Ok(existing.id);
    }
    let (base_url, base_url_test) = match category {
        IntegrationCategory::Shipping => (SHIPPING_BASE_URL, Some(SHIPPING_BASE_URL_TEST)),
        _ => ("https://graph.facebook.com", None),
    };
    storage
        .insert_integration_type(&IntegrationType {
            id: 0,
            code: code.to_string(),
            name: code.to_string(),
            category,
            base_url: base_url.to_string(),
            base_url_test: base_url_test.map(str::to_string),
            platform_credentials: None,
        })
        .await
}

/// An active integration whose credentials are sealed with `vault`.
pub async fn integration(
    storage: &dyn IntegrationRepository,
    vault: &CredentialVault,
    business_id: i64,
    code: &str,
    category: IntegrationCategory,
    is_testing: bool,
    credentials: Value,
) -> Result<Integration, ConectaError> {
    let type_id = integration_type(storage, code, category).await?;
    let plain = match credentials {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let sealed = vault.encrypt_wrapped(&plain)?;
    storage
        .insert_integration(&NewIntegration {
            business_id: Some(business_id),
            integration_type_id: type_id,
            name: code.to_string(),
            is_active: true,
            is_testing,
            config: json!({}),
            credentials: Some(sealed),
        })
        .await
}

pub async fn envioclick(
    storage: &dyn IntegrationRepository,
    vault: &CredentialVault,
    business_id: i64,
    is_testing: bool,
) -> Result<Integration, ConectaError> {
    integration(
        storage,
        vault,
        business_id,
        "envioclick",
        IntegrationCategory::Shipping,
        is_testing,
        json!({"api_key": "K"}),
    )
    .await
}

pub async fn whatsapp(
    storage: &dyn IntegrationRepository,
    vault: &CredentialVault,
    business_id: i64,
) -> Result<Integration, ConectaError> {
    integration(
        storage,
        vault,
        business_id,
        "whatsapp",
        IntegrationCategory::Messaging,
        false,
        json!({"phone_number_id": "1099", "access_token": "EAAG"}),
    )
    .await
}

pub fn order(id: &str, business_id: i64, order_number: &str) -> Order {
    let now = Utc::now();
    Order {
        id: id.to_string(),
        business_id,
        order_number: order_number.to_string(),
        customer_name: "Ana".to_string(),
        customer_phone: "+573001234567".to_string(),
        payment_method_id: Some(3),
        status: "paid".to_string(),
        integration_id: Some(1),
        total: 85000.0,
        currency: "COP".to_string(),
        guide_link: None,
        tracking_number: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn origin_address(alias: &str) -> OriginAddressInput {
    OriginAddressInput {
        alias: alias.to_string(),
        contact_name: "Bodega Central".to_string(),
        phone: "3001234567".to_string(),
        street: "Cra 7 # 12-34".to_string(),
        city: "Bogotá".to_string(),
        state: "Cundinamarca".to_string(),
        dane_code: "11001000".to_string(),
        ..Default::default()
    }
}

/// Bogotá to Medellín, one 1 kg 20x20x20 box worth 100.000 COP.
pub fn shipment_body(order_uuid: Option<&str>) -> Value {
    let mut body = json!({
        "origin": {"dane_code": "11001000"},
        "destination": {"dane_code": "05001000"},
        "packages": [{"weight": 1.0, "length": 20.0, "width": 20.0, "height": 20.0}],
        "declared_value": 100000.0,
        "currency": "COP"
    });
    if let Some(order_uuid) = order_uuid {
        body["order_uuid"] = json!(order_uuid);
    }
    body
}

pub fn notification_config(
    integration_id: i64,
    priority: i64,
    conditions: NotificationConditions,
    template: &str,
) -> NewNotificationConfig {
    NewNotificationConfig {
        integration_id,
        notification_type: "whatsapp".to_string(),
        is_active: true,
        priority,
        conditions,
        config: NotificationTemplate {
            template_name: template.to_string(),
            language: "es".to_string(),
            recipient_type: "customer".to_string(),
        },
    }
}
