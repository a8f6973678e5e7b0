use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::GatewayConfig,
    domain::{Membership, PaymentRequest},
    error::{AppError, Result},
};

/// External payment processor. Creates checkout preferences for payment
/// requests and answers queries about gateway-side payments so webhook
/// notifications can be verified instead of trusted.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(
        &self,
        request: &PaymentRequest,
        membership: &Membership,
    ) -> Result<GatewayPreference>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment>;
}

/// Opaque redirect token returned by the processor. The external reference
/// is the payment request id, echoed back in webhook notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPreference {
    pub id: String,
    pub checkout_url: String,
    pub external_reference: String,
}

/// The processor's view of a payment, fetched during webhook handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: GatewayPaymentStatus,
    pub external_reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    Approved,
    Pending,
    InProcess,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    Unknown,
}

impl GatewayPaymentStatus {
    /// The processor occasionally introduces new status values; anything
    /// unrecognized maps to Unknown rather than failing the whole
    /// notification.
    fn from_api(value: &str) -> Self {
        match value {
            "approved" => GatewayPaymentStatus::Approved,
            "pending" => GatewayPaymentStatus::Pending,
            "in_process" => GatewayPaymentStatus::InProcess,
            "rejected" => GatewayPaymentStatus::Rejected,
            "cancelled" => GatewayPaymentStatus::Cancelled,
            "refunded" => GatewayPaymentStatus::Refunded,
            "charged_back" => GatewayPaymentStatus::ChargedBack,
            _ => GatewayPaymentStatus::Unknown,
        }
    }
}

/// Client for a MercadoPago-style checkout-preference API.
pub struct MercadoPagoClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    success_url: String,
    failure_url: String,
    pending_url: String,
    notification_url: String,
}

#[derive(Serialize)]
struct PreferenceItem {
    title: String,
    description: Option<String>,
    quantity: i64,
    unit_price: f64,
    currency_id: &'static str,
}

#[derive(Serialize)]
struct PreferenceBackUrls<'a> {
    success: &'a str,
    failure: &'a str,
    pending: &'a str,
}

#[derive(Serialize)]
struct CreatePreferenceBody<'a> {
    items: Vec<PreferenceItem>,
    external_reference: String,
    back_urls: PreferenceBackUrls<'a>,
    notification_url: &'a str,
    auto_return: &'a str,
}

#[derive(Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: String,
}

#[derive(Deserialize)]
struct PaymentResponse {
    id: i64,
    status: String,
    external_reference: Option<String>,
}

impl MercadoPagoClient {
    pub fn new(access_token: String, config: &GatewayConfig, server_base_url: &str) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.mercadopago.com".to_string());
        let success_url = config
            .success_url
            .clone()
            .unwrap_or_else(|| format!("{}/payments/success", server_base_url));
        let failure_url = config
            .failure_url
            .clone()
            .unwrap_or_else(|| format!("{}/payments/failure", server_base_url));
        let pending_url = config
            .pending_url
            .clone()
            .unwrap_or_else(|| format!("{}/payments/pending", server_base_url));
        let notification_url = config
            .notification_url
            .clone()
            .unwrap_or_else(|| format!("{}/api/payments/webhook/gateway", server_base_url));

        Self {
            http: reqwest::Client::new(),
            base_url,
            access_token,
            success_url,
            failure_url,
            pending_url,
            notification_url,
        }
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_preference(
        &self,
        request: &PaymentRequest,
        membership: &Membership,
    ) -> Result<GatewayPreference> {
        let external_reference = request.id.to_string();
        let body = CreatePreferenceBody {
            items: vec![PreferenceItem {
                title: format!("{} membership", membership.name),
                description: membership.description.clone(),
                quantity: 1,
                unit_price: membership.price_cents as f64 / 100.0,
                currency_id: "ARS",
            }],
            external_reference: external_reference.clone(),
            back_urls: PreferenceBackUrls {
                success: &self.success_url,
                failure: &self.failure_url,
                pending: &self.pending_url,
            },
            notification_url: &self.notification_url,
            auto_return: "approved",
        };

        let response = self
            .http
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Preference request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Gateway returned {} creating preference: {}",
                status, detail
            )));
        }

        let preference: PreferenceResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid preference response: {}", e)))?;

        Ok(GatewayPreference {
            id: preference.id,
            checkout_url: preference.init_point,
            external_reference,
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        let response = self
            .http
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Payment lookup failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Gateway returned {} fetching payment {}: {}",
                status, payment_id, detail
            )));
        }

        let payment: PaymentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid payment response: {}", e)))?;

        let external_reference = payment.external_reference.ok_or_else(|| {
            AppError::Gateway(format!(
                "Gateway payment {} carries no external reference",
                payment.id
            ))
        })?;

        Ok(GatewayPayment {
            id: payment.id.to_string(),
            status: GatewayPaymentStatus::from_api(&payment.status),
            external_reference,
        })
    }
}
