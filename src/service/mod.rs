pub mod payment_lifecycle_service;

use std::sync::Arc;
use sqlx::SqlitePool;

use crate::payments::PaymentGateway;
use crate::repository::*;

pub use payment_lifecycle_service::PaymentLifecycleService;

pub struct ServiceContext {
    pub payment_request_repo: Arc<dyn PaymentRequestRepository>,
    pub membership_repo: Arc<dyn MembershipRepository>,
    pub payment_lifecycle: Arc<PaymentLifecycleService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        payment_request_repo: Arc<dyn PaymentRequestRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        db_pool: SqlitePool,
    ) -> Self {
        let payment_lifecycle = Arc::new(PaymentLifecycleService::new(
            payment_request_repo.clone(),
            membership_repo.clone(),
            gateway,
        ));

        Self {
            payment_request_repo,
            membership_repo,
            payment_lifecycle,
            db_pool,
        }
    }
}
