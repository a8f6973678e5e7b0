use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod membership_repository;
pub mod payment_request_repository;

pub use membership_repository::SqliteMembershipRepository;
pub use payment_request_repository::SqlitePaymentRequestRepository;

/// Persistence for payment requests and their append-only status history.
#[async_trait]
pub trait PaymentRequestRepository: Send + Sync {
    /// Creates the request row together with its initial "Pending" history
    /// entry in one transaction.
    async fn create(&self, request: CreatePaymentRequest) -> Result<PaymentRequest>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentRequest>>;
    async fn latest_history_for(&self, request_id: Uuid) -> Result<Option<StatusHistoryEntry>>;
    async fn history_for(&self, request_id: Uuid) -> Result<Vec<StatusHistoryEntry>>;
    /// Appends a history entry with status `target`, conditional on the
    /// request's current status still being `expected`. The check and the
    /// insert are atomic; of two racing transitions at most one succeeds
    /// and the loser observes `AppError::InvalidTransition`.
    async fn append_transition(
        &self,
        request_id: Uuid,
        expected: RequestState,
        target: RequestState,
    ) -> Result<StatusHistoryEntry>;
    async fn find_status_by_name(&self, name: &str) -> Result<Option<PaymentStatus>>;
    async fn find_status_by_id(&self, id: i64) -> Result<Option<PaymentStatus>>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PaymentRequest>>;
    async fn list_payment_types(&self) -> Result<Vec<PaymentType>>;
    async fn find_payment_type_by_id(&self, id: i64) -> Result<Option<PaymentType>>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Membership>>;
    async fn list(&self) -> Result<Vec<Membership>>;
    /// Validity window derived from the user's most recently confirmed
    /// payment request, or None if they never had one.
    async fn validity_for_user(&self, user_id: &str) -> Result<Option<MembershipValidity>>;
}
