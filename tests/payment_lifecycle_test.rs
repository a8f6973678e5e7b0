use std::sync::Arc;

use chrono::Duration;
use ironclub::{
    domain::{CreatePaymentRequest, RequestState},
    error::AppError,
    repository::{
        PaymentRequestRepository, SqliteMembershipRepository, SqlitePaymentRequestRepository,
    },
    service::PaymentLifecycleService,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

// A pooled :memory: database hands each new connection its own empty
// database, so cap the pool at one connection to keep every query on the
// migrated schema.
async fn setup_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

fn lifecycle(pool: &SqlitePool) -> PaymentLifecycleService {
    PaymentLifecycleService::new(
        Arc::new(SqlitePaymentRequestRepository::new(pool.clone())),
        Arc::new(SqliteMembershipRepository::new(pool.clone())),
        None,
    )
}

fn annual_request_for(user_id: &str) -> CreatePaymentRequest {
    CreatePaymentRequest {
        membership_id: 5,
        payment_type_id: 1,
        user_id: user_id.to_string(),
    }
}

#[tokio::test]
async fn test_create_yields_single_pending_entry() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let repo = SqlitePaymentRequestRepository::new(pool.clone());
    let service = lifecycle(&pool);

    let request = service.create_payment_request(annual_request_for("u1")).await?;
    assert_eq!(request.membership_id, 5);
    assert_eq!(request.payment_type_id, 1);
    assert_eq!(request.user_id, "u1");

    let history = repo.history_for(request.id).await?;
    assert_eq!(history.len(), 1);

    let current = service.current_status(request.id).await?;
    assert_eq!(current.status.name, "Pending");
    assert_eq!(current.entry.id, history[0].id);

    Ok(())
}

#[tokio::test]
async fn test_cash_confirmation_flow() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let repo = SqlitePaymentRequestRepository::new(pool.clone());
    let service = lifecycle(&pool);

    let request = service.create_payment_request(annual_request_for("u1")).await?;

    let entry = service.confirm_cash_payment(request.id).await?;
    assert_eq!(entry.payment_request_id, request.id);

    let current = service.current_status(request.id).await?;
    assert_eq!(current.status.name, "Confirmed");

    let history = repo.history_for(request.id).await?;
    assert_eq!(history.len(), 2);

    // Confirmed is terminal: a later cancellation must fail and append nothing
    let err = service.cancel_payment_request(request.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let history = repo.history_for(request.id).await?;
    assert_eq!(history.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_cancellation_is_terminal() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let repo = SqlitePaymentRequestRepository::new(pool.clone());
    let service = lifecycle(&pool);

    let request = service.create_payment_request(annual_request_for("u1")).await?;

    service.cancel_payment_request(request.id).await?;

    let current = service.current_status(request.id).await?;
    assert_eq!(current.status.name, "Cancelled");

    let err = service.confirm_cash_payment(request.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let history = repo.history_for(request.id).await?;
    assert_eq!(history.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_unknown_request_is_not_found() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let service = lifecycle(&pool);
    let missing = uuid::Uuid::new_v4();

    let err = service.confirm_cash_payment(missing).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = service.cancel_payment_request(missing).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = service.current_status(missing).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_dangling_references_are_rejected() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let service = lifecycle(&pool);

    let err = service
        .create_payment_request(CreatePaymentRequest {
            membership_id: 999,
            payment_type_id: 1,
            user_id: "u1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidReference(_)));

    let err = service
        .create_payment_request(CreatePaymentRequest {
            membership_id: 5,
            payment_type_id: 999,
            user_id: "u1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidReference(_)));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_confirm_and_cancel() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let repo = SqlitePaymentRequestRepository::new(pool.clone());
    let service = lifecycle(&pool);

    let request = service.create_payment_request(annual_request_for("u1")).await?;

    let (confirm, cancel) = tokio::join!(
        service.confirm_cash_payment(request.id),
        service.cancel_payment_request(request.id)
    );

    // Exactly one transition may win; the loser observes the precondition failure
    assert!(confirm.is_ok() != cancel.is_ok());
    let loser = if confirm.is_ok() { cancel } else { confirm };
    assert!(matches!(loser.unwrap_err(), AppError::InvalidTransition(_)));

    let history = repo.history_for(request.id).await?;
    assert_eq!(history.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_current_status_is_latest_entry() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let repo = SqlitePaymentRequestRepository::new(pool.clone());
    let service = lifecycle(&pool);

    let request = service.create_payment_request(annual_request_for("u1")).await?;
    service.confirm_cash_payment(request.id).await?;

    let history = repo.history_for(request.id).await?;
    let max_id = history.iter().map(|e| e.id).max().unwrap();

    let latest = repo.latest_history_for(request.id).await?.unwrap();
    assert_eq!(latest.id, max_id);

    let current = service.current_status(request.id).await?;
    assert_eq!(current.entry.id, max_id);

    Ok(())
}

#[tokio::test]
async fn test_listing_requests_and_types() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let service = lifecycle(&pool);

    service.create_payment_request(annual_request_for("u1")).await?;
    service
        .create_payment_request(CreatePaymentRequest {
            membership_id: 2,
            payment_type_id: 2,
            user_id: "u1".to_string(),
        })
        .await?;
    service.create_payment_request(annual_request_for("u2")).await?;

    let for_u1 = service.list_requests_for_user("u1").await?;
    assert_eq!(for_u1.len(), 2);
    assert!(for_u1.iter().all(|r| r.user_id == "u1"));

    let for_nobody = service.list_requests_for_user("nobody").await?;
    assert!(for_nobody.is_empty());

    let types = service.list_payment_types().await?;
    let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
    assert!(names.contains(&"Cash"));
    assert!(names.contains(&"Online"));

    Ok(())
}

#[tokio::test]
async fn test_membership_validity_window() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let service = lifecycle(&pool);

    let request = service.create_payment_request(annual_request_for("u1")).await?;
    let entry = service.confirm_cash_payment(request.id).await?;

    let validity = service.membership_validity("u1").await?;
    assert_eq!(validity.membership_id, 5);
    assert_eq!(validity.membership_name, "Annual");
    assert_eq!(validity.confirmed_at, entry.changed_at);
    assert_eq!(validity.valid_until - validity.confirmed_at, Duration::days(365));
    assert!(validity.active);

    let err = service.membership_validity("nobody").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_validity_follows_latest_confirmation() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let service = lifecycle(&pool);

    // An older confirmed monthly plan, then a newly confirmed annual one
    let monthly = service
        .create_payment_request(CreatePaymentRequest {
            membership_id: 2,
            payment_type_id: 1,
            user_id: "u1".to_string(),
        })
        .await?;
    service.confirm_cash_payment(monthly.id).await?;

    let annual = service.create_payment_request(annual_request_for("u1")).await?;
    service.confirm_cash_payment(annual.id).await?;

    let validity = service.membership_validity("u1").await?;
    assert_eq!(validity.membership_id, 5);

    Ok(())
}

#[tokio::test]
async fn test_request_state_helpers() {
    assert_eq!(RequestState::from_name("Pending"), Some(RequestState::Pending));
    assert_eq!(RequestState::from_name("Confirmed"), Some(RequestState::Confirmed));
    assert_eq!(RequestState::from_name("Cancelled"), Some(RequestState::Cancelled));
    assert_eq!(RequestState::from_name("Refunded"), None);

    assert!(!RequestState::Pending.is_terminal());
    assert!(RequestState::Confirmed.is_terminal());
    assert!(RequestState::Cancelled.is_terminal());
}
