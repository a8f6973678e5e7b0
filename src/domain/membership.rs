use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog row for a purchasable membership. Seeded by migration and
/// read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub duration_days: i64,
}

/// Derived view: the window during which a user's most recently confirmed
/// membership purchase is in force. Never stored; always computed from the
/// request history.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipValidity {
    pub user_id: String,
    pub membership_id: i64,
    pub membership_name: String,
    pub confirmed_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub active: bool,
}
