//! Alert models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::UnknownVariant;

/// Condition an alert reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    NegativeInventory,
    LowStock,
    PaymentOverdue,
    ShrinkageDetected,
    ReconciliationMismatch,
}

impl AlertType {
    pub const ALL: [AlertType; 5] = [
        AlertType::NegativeInventory,
        AlertType::LowStock,
        AlertType::PaymentOverdue,
        AlertType::ShrinkageDetected,
        AlertType::ReconciliationMismatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::NegativeInventory => "NEGATIVE_INVENTORY",
            AlertType::LowStock => "LOW_STOCK",
            AlertType::PaymentOverdue => "PAYMENT_OVERDUE",
            AlertType::ShrinkageDetected => "SHRINKAGE_DETECTED",
            AlertType::ReconciliationMismatch => "RECONCILIATION_MISMATCH",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AlertType::NegativeInventory
            | AlertType::ShrinkageDetected
            | AlertType::ReconciliationMismatch => Severity::Critical,
            AlertType::LowStock | AlertType::PaymentOverdue => Severity::Warning,
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("alert type", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Warning => "WARNING",
        }
    }
}

impl FromStr for Severity {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRITICAL" => Ok(Severity::Critical),
            "WARNING" => Ok(Severity::Warning),
            other => Err(UnknownVariant::new("severity", other)),
        }
    }
}

/// Alert lifecycle; only moves forward
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Open => "OPEN",
            AlertStatus::Acknowledged => "ACKNOWLEDGED",
            AlertStatus::Resolved => "RESOLVED",
        }
    }

    /// Open and acknowledged alerts suppress new alerts for the same subject
    pub fn is_unresolved(&self) -> bool {
        !matches!(self, AlertStatus::Resolved)
    }

    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Open, AlertStatus::Acknowledged)
                | (AlertStatus::Open, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        )
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(AlertStatus::Open),
            "ACKNOWLEDGED" => Ok(AlertStatus::Acknowledged),
            "RESOLVED" => Ok(AlertStatus::Resolved),
            other => Err(UnknownVariant::new("alert status", other)),
        }
    }
}

/// An operator-facing alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub product_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub status: AlertStatus,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// New open alert; severity follows from the type
    pub fn open(alert_type: AlertType, title: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type,
            severity: alert_type.severity(),
            title,
            description,
            product_id: None,
            store_id: None,
            location_id: None,
            status: AlertStatus::Open,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_product(mut self, product_id: Uuid) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_store(mut self, store_id: Uuid) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_location(mut self, location_id: Uuid) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Move to `next`, stamping who did it and when
    pub fn transition(
        &mut self,
        next: AlertStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!("Cannot move alert from {} to {}", self.status, next));
        }

        match next {
            AlertStatus::Acknowledged => {
                self.acknowledged_by = Some(actor.to_string());
                self.acknowledged_at = Some(at);
            }
            AlertStatus::Resolved => {
                self.resolved_by = Some(actor.to_string());
                self.resolved_at = Some(at);
            }
            AlertStatus::Open => {}
        }
        self.status = next;
        Ok(())
    }
}

/// Query over alerts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    /// Only OPEN or ACKNOWLEDGED alerts
    #[serde(default)]
    pub unresolved_only: bool,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.status.map_or(true, |s| alert.status == s)
            && self.alert_type.map_or(true, |t| alert.alert_type == t)
            && (!self.unresolved_only || alert.status.is_unresolved())
    }
}
