use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{
    api::state::AppState,
    domain::{Membership, MembershipValidity},
    error::{AppError, Result},
    repository::MembershipRepository,
};

#[derive(Debug, Serialize)]
pub struct MembershipDto {
    id: i64,
    name: String,
    description: Option<String>,
    price_cents: i64,
    duration_days: i64,
}

impl From<Membership> for MembershipDto {
    fn from(membership: Membership) -> Self {
        Self {
            id: membership.id,
            name: membership.name,
            description: membership.description,
            price_cents: membership.price_cents,
            duration_days: membership.duration_days,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidityDto {
    user_id: String,
    membership_id: i64,
    membership_name: String,
    confirmed_at: String,
    valid_until: String,
    active: bool,
}

impl From<MembershipValidity> for ValidityDto {
    fn from(validity: MembershipValidity) -> Self {
        Self {
            user_id: validity.user_id,
            membership_id: validity.membership_id,
            membership_name: validity.membership_name,
            confirmed_at: validity.confirmed_at.to_rfc3339(),
            valid_until: validity.valid_until.to_rfc3339(),
            active: validity.active,
        }
    }
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<MembershipDto>>> {
    let memberships = state.service_context.membership_repo.list().await?;

    Ok(Json(memberships.into_iter().map(Into::into).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MembershipDto>> {
    let membership = state.service_context.membership_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

    Ok(Json(membership.into()))
}

pub async fn validity(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ValidityDto>> {
    let validity = state.service_context.payment_lifecycle
        .membership_validity(&user_id)
        .await?;

    Ok(Json(validity.into()))
}
