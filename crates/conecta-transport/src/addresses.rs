// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Origin addresses a business ships from.
//!
//! The first address of a business becomes its default, setting a new
//! default clears the previous one, and the default cannot be deleted.
//! The storage layer enforces those rules transactionally; this service
//! validates input and turns absent rows into `NotFound`.

use std::sync::Arc;

use conecta_core::{ConectaError, OriginAddress, OriginAddressInput, Storage};
use tracing::info;

use crate::request::is_dane_code;

#[derive(Clone)]
pub struct AddressService {
    storage: Arc<dyn Storage>,
}

impl AddressService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn create(
        &self,
        business_id: i64,
        input: &OriginAddressInput,
    ) -> Result<OriginAddress, ConectaError> {
        validate(input)?;
        let address = self.storage.create_address(business_id, input).await?;
        info!(business_id, address_id = address.id, is_default = address.is_default, "origin address created");
        Ok(address)
    }

    pub async fn get(&self, business_id: i64, id: i64) -> Result<OriginAddress, ConectaError> {
        self.storage
            .get_address(business_id, id)
            .await?
            .ok_or_else(|| ConectaError::not_found("origin address", id))
    }

    /// Default address first.
    pub async fn list(&self, business_id: i64) -> Result<Vec<OriginAddress>, ConectaError> {
        self.storage.list_addresses(business_id).await
    }

    pub async fn update(
        &self,
        business_id: i64,
        id: i64,
        input: &OriginAddressInput,
    ) -> Result<OriginAddress, ConectaError> {
        validate(input)?;
        self.storage.update_address(business_id, id, input).await
    }

    pub async fn set_default(&self, business_id: i64, id: i64) -> Result<OriginAddress, ConectaError> {
        self.storage.set_default_address(business_id, id).await?;
        info!(business_id, address_id = id, "default origin address changed");
        self.get(business_id, id).await
    }

    pub async fn delete(&self, business_id: i64, id: i64) -> Result<(), ConectaError> {
        self.storage.delete_address(business_id, id).await?;
        info!(business_id, address_id = id, "origin address deleted");
        Ok(())
    }

    /// The default address, if the business has any address at all.
    pub async fn default_address(
        &self,
        business_id: i64,
    ) -> Result<Option<OriginAddress>, ConectaError> {
        let addresses = self.storage.list_addresses(business_id).await?;
        Ok(addresses.into_iter().find(|a| a.is_default))
    }
}

fn validate(input: &OriginAddressInput) -> Result<(), ConectaError> {
    let required = [
        ("alias", &input.alias),
        ("contact_name", &input.contact_name),
        ("phone", &input.phone),
        ("street", &input.street),
        ("city", &input.city),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ConectaError::invalid(field, "is required"));
        }
    }
    if !is_dane_code(&input.dane_code) {
        return Err(ConectaError::invalid("dane_code", "must be a DANE code"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_names_the_field() {
        let input = OriginAddressInput {
            alias: "Bodega".into(),
            contact_name: "Ana".into(),
            phone: "3001234567".into(),
            street: " ".into(),
            city: "Bogotá".into(),
            dane_code: "11001".into(),
            ..Default::default()
        };
        let err = validate(&input).unwrap_err();
        assert!(err.to_string().contains("street"));

        let mut fixed = input.clone();
        fixed.street = "Cra 7".into();
        validate(&fixed).unwrap();
        fixed.dane_code = "x".into();
        assert!(validate(&fixed).is_err());
    }
}
