use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{Membership, MembershipValidity, RequestState},
    error::{AppError, Result},
    repository::MembershipRepository,
};

#[derive(FromRow)]
struct MembershipRow {
    id: i64,
    name: String,
    description: Option<String>,
    price_cents: i64,
    duration_days: i64,
}

#[derive(FromRow)]
struct ValidityRow {
    user_id: String,
    membership_id: i64,
    membership_name: String,
    duration_days: i64,
    confirmed_at: NaiveDateTime,
}

pub struct SqliteMembershipRepository {
    pool: SqlitePool,
}

impl SqliteMembershipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_membership(row: MembershipRow) -> Membership {
        Membership {
            id: row.id,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            duration_days: row.duration_days,
        }
    }
}

#[async_trait]
impl MembershipRepository for SqliteMembershipRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, name, description, price_cents, duration_days
            FROM memberships
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(Self::row_to_membership))
    }

    async fn list(&self) -> Result<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, name, description, price_cents, duration_days
            FROM memberships
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::row_to_membership).collect())
    }

    async fn validity_for_user(&self, user_id: &str) -> Result<Option<MembershipValidity>> {
        let row = sqlx::query_as::<_, ValidityRow>(
            r#"
            SELECT r.user_id AS user_id,
                   m.id AS membership_id,
                   m.name AS membership_name,
                   m.duration_days AS duration_days,
                   h.changed_at AS confirmed_at
            FROM payment_request_history h
            JOIN payment_requests r ON r.id = h.payment_request_id
            JOIN memberships m ON m.id = r.membership_id
            JOIN payment_statuses s ON s.id = h.status_id
            WHERE r.user_id = ? AND s.name = ?
            ORDER BY h.id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(RequestState::Confirmed.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(|r| {
            let confirmed_at = DateTime::from_naive_utc_and_offset(r.confirmed_at, Utc);
            let valid_until = confirmed_at + Duration::days(r.duration_days);
            MembershipValidity {
                user_id: r.user_id,
                membership_id: r.membership_id,
                membership_name: r.membership_name,
                confirmed_at,
                valid_until,
                active: valid_until > Utc::now(),
            }
        }))
    }
}
