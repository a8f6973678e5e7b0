use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{CreatePaymentRequest, CurrentStatus, PaymentRequest, PaymentType, StatusHistoryEntry},
    error::{AppError, Result},
    payments::GatewayPreference,
};

#[derive(Debug, Serialize)]
pub struct PaymentRequestDto {
    id: Uuid,
    membership_id: i64,
    payment_type_id: i64,
    user_id: String,
    created_at: String,
}

impl From<PaymentRequest> for PaymentRequestDto {
    fn from(request: PaymentRequest) -> Self {
        Self {
            id: request.id,
            membership_id: request.membership_id,
            payment_type_id: request.payment_type_id,
            user_id: request.user_id,
            created_at: request.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryDto {
    id: i64,
    payment_request_id: Uuid,
    status_id: i64,
    changed_at: String,
}

impl From<StatusHistoryEntry> for HistoryEntryDto {
    fn from(entry: StatusHistoryEntry) -> Self {
        Self {
            id: entry.id,
            payment_request_id: entry.payment_request_id,
            status_id: entry.status_id,
            changed_at: entry.changed_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentStatusDto {
    request: PaymentRequestDto,
    status: String,
    changed_at: String,
}

impl From<CurrentStatus> for CurrentStatusDto {
    fn from(current: CurrentStatus) -> Self {
        Self {
            request: current.request.into(),
            status: current.status.name,
            changed_at: current.entry.changed_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequestDto {
    membership_id: i64,
    payment_type_id: i64,
    user_id: String,
}

pub async fn create(
    State(state): State<AppState>,
    Json(dto): Json<CreatePaymentRequestDto>,
) -> Result<(StatusCode, Json<PaymentRequestDto>)> {
    if dto.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id must not be empty".to_string()));
    }

    let request = state.service_context.payment_lifecycle
        .create_payment_request(CreatePaymentRequest {
            membership_id: dto.membership_id,
            payment_type_id: dto.payment_type_id,
            user_id: dto.user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(request.into())))
}

pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CurrentStatusDto>> {
    let current = state.service_context.payment_lifecycle
        .current_status(id)
        .await?;

    Ok(Json(current.into()))
}

pub async fn confirm_cash(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryEntryDto>> {
    let entry = state.service_context.payment_lifecycle
        .confirm_cash_payment(id)
        .await?;

    Ok(Json(entry.into()))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryEntryDto>> {
    let entry = state.service_context.payment_lifecycle
        .cancel_payment_request(id)
        .await?;

    Ok(Json(entry.into()))
}

#[derive(Debug, Serialize)]
pub struct CheckoutDto {
    preference_id: String,
    checkout_url: String,
    external_reference: String,
}

impl From<GatewayPreference> for CheckoutDto {
    fn from(preference: GatewayPreference) -> Self {
        Self {
            preference_id: preference.id,
            checkout_url: preference.checkout_url,
            external_reference: preference.external_reference,
        }
    }
}

pub async fn checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutDto>> {
    let preference = state.service_context.payment_lifecycle
        .initiate_gateway_payment(id)
        .await?;

    Ok(Json(preference.into()))
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    requests: Vec<PaymentRequestDto>,
    total: usize,
}

pub async fn list_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ListResponse>> {
    let requests = state.service_context.payment_lifecycle
        .list_requests_for_user(&user_id)
        .await?;

    let total = requests.len();
    let requests: Vec<PaymentRequestDto> = requests.into_iter().map(Into::into).collect();

    Ok(Json(ListResponse { requests, total }))
}

pub async fn list_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentType>>> {
    let types = state.service_context.payment_lifecycle
        .list_payment_types()
        .await?;

    Ok(Json(types))
}

/// Gateway notification body. The processor posts `{"type": "payment",
/// "data": {"id": ...}}`; the id arrives as a string or a number depending
/// on the notification channel.
#[derive(Debug, Deserialize)]
pub struct GatewayNotificationDto {
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<GatewayNotificationData>,
}

#[derive(Debug, Deserialize)]
pub struct GatewayNotificationData {
    id: Value,
}

pub async fn gateway_webhook(
    State(state): State<AppState>,
    Json(notification): Json<GatewayNotificationDto>,
) -> Result<StatusCode> {
    if notification.kind.as_deref() != Some("payment") {
        tracing::debug!(
            "Ignoring gateway notification of type {:?}",
            notification.kind
        );
        return Ok(StatusCode::OK);
    }

    let data = notification
        .data
        .ok_or_else(|| AppError::BadRequest("Notification carries no data".to_string()))?;

    let payment_id = match &data.id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(AppError::BadRequest("Notification data.id is not an id".to_string())),
    };

    state.service_context.payment_lifecycle
        .handle_gateway_notification(&payment_id)
        .await?;

    Ok(StatusCode::OK)
}
