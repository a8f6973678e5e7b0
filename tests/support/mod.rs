use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ironclub::{
    domain::{Membership, PaymentRequest},
    error::{AppError, Result},
    payments::{GatewayPayment, GatewayPreference, PaymentGateway},
};

/// Scripted stand-in for the external payment processor. Records every
/// preference it creates and serves back whatever payments the test
/// scripted into it.
#[derive(Default)]
pub struct FakeGateway {
    pub preferences: Mutex<Vec<GatewayPreference>>,
    payments: Mutex<HashMap<String, GatewayPayment>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_payment(&self, payment: GatewayPayment) {
        self.payments
            .lock()
            .unwrap()
            .insert(payment.id.clone(), payment);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_preference(
        &self,
        request: &PaymentRequest,
        _membership: &Membership,
    ) -> Result<GatewayPreference> {
        let preference = GatewayPreference {
            id: format!("pref-{}", request.id),
            checkout_url: format!("https://gateway.test/checkout/{}", request.id),
            external_reference: request.id.to_string(),
        };
        self.preferences.lock().unwrap().push(preference.clone());
        Ok(preference)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| AppError::Gateway(format!("Unknown gateway payment {}", payment_id)))
    }
}
