use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single purchase intent: one membership, one payment method, one owner.
/// Immutable after creation; everything that happens to it afterwards is
/// recorded in its status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub id: Uuid,
    pub membership_id: i64,
    pub payment_type_id: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Catalog row for a request status. The catalog is fixed and seeded by
/// migration; rows are looked up by name or id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentStatus {
    pub id: i64,
    pub name: String,
}

/// One append-only record of a status assigned to a payment request.
/// Entries are never mutated or deleted; the current state of a request
/// is the status of its highest-id entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub payment_request_id: Uuid,
    pub status_id: i64,
    pub changed_at: DateTime<Utc>,
}

/// Catalog row for how a request will be settled (cash at the front desk
/// or the online gateway).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub membership_id: i64,
    pub payment_type_id: i64,
    pub user_id: String,
}

/// A request joined with its latest history entry and that entry's status.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentStatus {
    pub request: PaymentRequest,
    pub entry: StatusHistoryEntry,
    pub status: PaymentStatus,
}

/// The legal states of a payment request. Pending is the initial state;
/// Confirmed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Pending,
    Confirmed,
    Cancelled,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Pending => "Pending",
            RequestState::Confirmed => "Confirmed",
            RequestState::Cancelled => "Cancelled",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Pending" => Some(RequestState::Pending),
            "Confirmed" => Some(RequestState::Confirmed),
            "Cancelled" => Some(RequestState::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestState::Pending)
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
