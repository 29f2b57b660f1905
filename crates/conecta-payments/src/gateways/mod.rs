// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concrete gateway clients.

use std::sync::Arc;
use std::time::Duration;

use crate::error::GatewayError;
use crate::gateway::PaymentGateway;

pub mod bold;
pub mod epayco;
pub mod mercadopago;
pub mod stripe;
pub mod wompi;

pub use bold::BoldGateway;
pub use epayco::EpaycoGateway;
pub use mercadopago::MercadoPagoGateway;
pub use stripe::StripeGateway;
pub use wompi::WompiGateway;

/// Builds the client for a gateway code from `payments.gateways`.
pub fn gateway_for(code: &str, timeout: Duration) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
    let gateway: Arc<dyn PaymentGateway> = match code {
        "bold" => Arc::new(BoldGateway::new(timeout)?),
        "mercadopago" => Arc::new(MercadoPagoGateway::new(timeout)?),
        "stripe" => Arc::new(StripeGateway::new(timeout)?),
        "epayco" => Arc::new(EpaycoGateway::new(timeout)?),
        "wompi" => Arc::new(WompiGateway::new(timeout)?),
        "nequi" => Arc::new(WompiGateway::nequi(timeout)?),
        other => return Err(GatewayError::Config(format!("unknown payment gateway '{other}'"))),
    };
    Ok(gateway)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_code_builds() {
        for code in ["bold", "mercadopago", "stripe", "epayco", "wompi", "nequi"] {
            let gw = gateway_for(code, Duration::from_secs(5)).unwrap();
            assert_eq!(gw.code(), code);
        }
        assert!(gateway_for("paypal", Duration::from_secs(5)).is_err());
    }
}
