use std::sync::Arc;

use uuid::Uuid;

use crate::{
    domain::{
        CreatePaymentRequest, CurrentStatus, MembershipValidity, PaymentRequest, PaymentType,
        RequestState, StatusHistoryEntry,
    },
    error::{AppError, Result},
    payments::{GatewayPaymentStatus, GatewayPreference, PaymentGateway},
    repository::{MembershipRepository, PaymentRequestRepository},
};

/// Enforces the payment-request state machine: Pending is the only initial
/// state, Pending→Confirmed and Pending→Cancelled are the only transitions,
/// and every transition appends exactly one history row.
pub struct PaymentLifecycleService {
    payment_repo: Arc<dyn PaymentRequestRepository>,
    membership_repo: Arc<dyn MembershipRepository>,
    gateway: Option<Arc<dyn PaymentGateway>>,
}

impl PaymentLifecycleService {
    pub fn new(
        payment_repo: Arc<dyn PaymentRequestRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Self {
        Self {
            payment_repo,
            membership_repo,
            gateway,
        }
    }

    pub async fn create_payment_request(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentRequest> {
        if self
            .membership_repo
            .find_by_id(request.membership_id)
            .await?
            .is_none()
        {
            return Err(AppError::InvalidReference(format!(
                "Membership {} does not exist",
                request.membership_id
            )));
        }

        if self
            .payment_repo
            .find_payment_type_by_id(request.payment_type_id)
            .await?
            .is_none()
        {
            return Err(AppError::InvalidReference(format!(
                "Payment type {} does not exist",
                request.payment_type_id
            )));
        }

        self.payment_repo.create(request).await
    }

    pub async fn confirm_cash_payment(&self, request_id: Uuid) -> Result<StatusHistoryEntry> {
        self.transition(request_id, RequestState::Confirmed).await
    }

    pub async fn cancel_payment_request(&self, request_id: Uuid) -> Result<StatusHistoryEntry> {
        self.transition(request_id, RequestState::Cancelled).await
    }

    pub async fn current_status(&self, request_id: Uuid) -> Result<CurrentStatus> {
        let request = self
            .payment_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Payment request {} not found", request_id))
            })?;

        let entry = self
            .payment_repo
            .latest_history_for(request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Payment request {} has no history", request_id))
            })?;

        let status = self
            .payment_repo
            .find_status_by_id(entry.status_id)
            .await?
            .ok_or_else(|| {
                AppError::Database(format!("Unknown status id {}", entry.status_id))
            })?;

        Ok(CurrentStatus {
            request,
            entry,
            status,
        })
    }

    /// Creates a checkout preference with the external gateway. Does not
    /// touch history: for gateway payments the Pending→Confirmed transition
    /// arrives later through the webhook path.
    pub async fn initiate_gateway_payment(&self, request_id: Uuid) -> Result<GatewayPreference> {
        let gateway = self.gateway()?;

        let request = self
            .payment_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Payment request {} not found", request_id))
            })?;

        let state = self.current_state(request_id).await?;
        if state != RequestState::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Payment request {} is already {}",
                request_id, state
            )));
        }

        let membership = self
            .membership_repo
            .find_by_id(request.membership_id)
            .await?
            .ok_or_else(|| {
                AppError::InvalidReference(format!(
                    "Membership {} does not exist",
                    request.membership_id
                ))
            })?;

        gateway.create_preference(&request, &membership).await
    }

    /// Webhook entry point. Verifies the notified payment against the
    /// gateway, then drives the state machine from the gateway's status.
    /// Returns None when the notification required no transition (still in
    /// flight at the processor, or a redelivery for an already settled
    /// request); gateways retry, so redeliveries are acknowledged rather
    /// than failed.
    pub async fn handle_gateway_notification(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<StatusHistoryEntry>> {
        let gateway = self.gateway()?;
        let payment = gateway.fetch_payment(gateway_payment_id).await?;

        let request_id = Uuid::parse_str(&payment.external_reference).map_err(|_| {
            AppError::Gateway(format!(
                "Gateway payment {} carries an invalid external reference: {}",
                payment.id, payment.external_reference
            ))
        })?;

        if self.payment_repo.find_by_id(request_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Payment request {} referenced by gateway payment {} not found",
                request_id, payment.id
            )));
        }

        let target = match payment.status {
            GatewayPaymentStatus::Approved => RequestState::Confirmed,
            GatewayPaymentStatus::Rejected | GatewayPaymentStatus::Cancelled => {
                RequestState::Cancelled
            }
            other => {
                tracing::debug!(
                    "Gateway payment {} still {:?}; nothing to record",
                    payment.id,
                    other
                );
                return Ok(None);
            }
        };

        match self
            .payment_repo
            .append_transition(request_id, RequestState::Pending, target)
            .await
        {
            Ok(entry) => {
                tracing::info!(
                    "Payment request {} moved to {} by gateway payment {}",
                    request_id,
                    target,
                    payment.id
                );
                Ok(Some(entry))
            }
            Err(AppError::InvalidTransition(_)) => {
                tracing::info!(
                    "Payment request {} already settled; ignoring redelivered notification for gateway payment {}",
                    request_id,
                    payment.id
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_requests_for_user(&self, user_id: &str) -> Result<Vec<PaymentRequest>> {
        self.payment_repo.list_for_user(user_id).await
    }

    pub async fn list_payment_types(&self) -> Result<Vec<PaymentType>> {
        self.payment_repo.list_payment_types().await
    }

    pub async fn membership_validity(&self, user_id: &str) -> Result<MembershipValidity> {
        self.membership_repo
            .validity_for_user(user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No confirmed membership payment for user {}",
                    user_id
                ))
            })
    }

    async fn transition(&self, request_id: Uuid, target: RequestState) -> Result<StatusHistoryEntry> {
        let state = self.current_state(request_id).await?;
        if state != RequestState::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Payment request {} is {}, not Pending",
                request_id, state
            )));
        }

        // The repository re-checks the precondition atomically, so a race
        // between two transitions resolves to exactly one appended row.
        self.payment_repo
            .append_transition(request_id, RequestState::Pending, target)
            .await
    }

    async fn current_state(&self, request_id: Uuid) -> Result<RequestState> {
        let entry = self
            .payment_repo
            .latest_history_for(request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Payment request {} not found", request_id))
            })?;

        let status = self
            .payment_repo
            .find_status_by_id(entry.status_id)
            .await?
            .ok_or_else(|| {
                AppError::Database(format!("Unknown status id {}", entry.status_id))
            })?;

        RequestState::from_name(&status.name).ok_or_else(|| {
            AppError::Database(format!("Unrecognized status name {}", status.name))
        })
    }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>> {
        self.gateway
            .as_ref()
            .ok_or_else(|| AppError::Gateway("Payment gateway is not configured".to_string()))
    }
}
