use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        CreatePaymentRequest, PaymentRequest, PaymentStatus, PaymentType, RequestState,
        StatusHistoryEntry,
    },
    error::{AppError, Result},
    repository::PaymentRequestRepository,
};

#[derive(FromRow)]
struct PaymentRequestRow {
    id: String,
    membership_id: i64,
    payment_type_id: i64,
    user_id: String,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct HistoryRow {
    id: i64,
    payment_request_id: String,
    status_id: i64,
    changed_at: NaiveDateTime,
}

pub struct SqlitePaymentRequestRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRequestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_request(row: PaymentRequestRow) -> Result<PaymentRequest> {
        Ok(PaymentRequest {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            membership_id: row.membership_id,
            payment_type_id: row.payment_type_id,
            user_id: row.user_id,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn row_to_entry(row: HistoryRow) -> Result<StatusHistoryEntry> {
        Ok(StatusHistoryEntry {
            id: row.id,
            payment_request_id: Uuid::parse_str(&row.payment_request_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            status_id: row.status_id,
            changed_at: DateTime::from_naive_utc_and_offset(row.changed_at, Utc),
        })
    }
}

#[async_trait]
impl PaymentRequestRepository for SqlitePaymentRequestRepository {
    async fn create(&self, request: CreatePaymentRequest) -> Result<PaymentRequest> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        // The request row and its initial Pending entry must land together:
        // no caller may ever observe a request without history.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO payment_requests (
                id, membership_id, payment_type_id, user_id, created_at
            ) VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(request.membership_id)
        .bind(request.payment_type_id)
        .bind(&request.user_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let pending: (i64,) = sqlx::query_as("SELECT id FROM payment_statuses WHERE name = ?")
            .bind(RequestState::Pending.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO payment_request_history (payment_request_id, status_id, changed_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(pending.0)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment request".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentRequest>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, PaymentRequestRow>(
            r#"
            SELECT id, membership_id, payment_type_id, user_id, created_at
            FROM payment_requests
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn latest_history_for(&self, request_id: Uuid) -> Result<Option<StatusHistoryEntry>> {
        let request_str = request_id.to_string();
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, payment_request_id, status_id, changed_at
            FROM payment_request_history
            WHERE payment_request_id = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(request_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_entry(r)?)),
            None => Ok(None),
        }
    }

    async fn history_for(&self, request_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
        let request_str = request_id.to_string();
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, payment_request_id, status_id, changed_at
            FROM payment_request_history
            WHERE payment_request_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(request_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn append_transition(
        &self,
        request_id: Uuid,
        expected: RequestState,
        target: RequestState,
    ) -> Result<StatusHistoryEntry> {
        let request_str = request_id.to_string();
        let now = Utc::now().naive_utc();

        // Single guarded statement: the insert only happens if the latest
        // entry for the request still carries the expected status. SQLite
        // executes the statement atomically, so of two racing transitions
        // at most one can pass the guard.
        let result = sqlx::query(
            r#"
            INSERT INTO payment_request_history (payment_request_id, status_id, changed_at)
            SELECT ?, s.id, ?
            FROM payment_statuses s
            WHERE s.name = ?
              AND (
                  SELECT h.status_id
                  FROM payment_request_history h
                  WHERE h.payment_request_id = ?
                  ORDER BY h.id DESC
                  LIMIT 1
              ) = (SELECT id FROM payment_statuses WHERE name = ?)
            "#,
        )
        .bind(&request_str)
        .bind(now)
        .bind(target.as_str())
        .bind(&request_str)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidTransition(format!(
                "Payment request {} is not in state {}",
                request_id,
                expected.as_str()
            )));
        }

        let entry_id = result.last_insert_rowid();
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, payment_request_id, status_id, changed_at
            FROM payment_request_history
            WHERE id = ?
            "#,
        )
        .bind(entry_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Self::row_to_entry(row)
    }

    async fn find_status_by_name(&self, name: &str) -> Result<Option<PaymentStatus>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM payment_statuses WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(|(id, name)| PaymentStatus { id, name }))
    }

    async fn find_status_by_id(&self, id: i64) -> Result<Option<PaymentStatus>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM payment_statuses WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(|(id, name)| PaymentStatus { id, name }))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PaymentRequest>> {
        let rows = sqlx::query_as::<_, PaymentRequestRow>(
            r#"
            SELECT id, membership_id, payment_type_id, user_id, created_at
            FROM payment_requests
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_request).collect()
    }

    async fn list_payment_types(&self) -> Result<Vec<PaymentType>> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM payment_types ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| PaymentType { id, name })
            .collect())
    }

    async fn find_payment_type_by_id(&self, id: i64) -> Result<Option<PaymentType>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM payment_types WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(|(id, name)| PaymentType { id, name }))
    }
}
