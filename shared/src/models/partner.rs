//! Partner store and vendor models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Lifecycle;

/// Supplier goods are received from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub notes: Option<String>,
    pub status: Lifecycle,
    pub created_at: DateTime<Utc>,
}

/// Partner store holding consignment stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub status: Lifecycle,
    pub created_at: DateTime<Utc>,
}

impl Store {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Physical count of boxes left at a store; an audit snapshot, never edited
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreCount {
    pub id: Uuid,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub count_date: NaiveDate,
    pub boxes_remaining: i64,
    pub counted_by: String,
    pub created_at: DateTime<Utc>,
}

/// Money collected from a store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorePayment {
    pub id: Uuid,
    pub store_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub collected_by: String,
    pub created_at: DateTime<Utc>,
}

/// Trim optional free text, treating blank input as absent
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
