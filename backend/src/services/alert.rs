//! Alert engine
//!
//! The scan is triggered from outside (a timer hitting the cron route) and
//! only raises an alert when no OPEN or ACKNOWLEDGED alert of the same type
//! already exists for the same subject.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    balances, Actor, Alert, AlertFilter, AlertStatus, AlertType, AppRole, LocationKind,
    MovementAction, MovementFilter, UnitType,
};
use uuid::Uuid;

use crate::config::AlertSettings;
use crate::error::{AppError, AppResult};
use crate::middleware::require_role;
use crate::store::LedgerStore;

/// Alert service
#[derive(Clone)]
pub struct AlertService {
    store: Arc<dyn LedgerStore>,
    settings: AlertSettings,
}

/// Alerts created by one scan, per type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertScanSummary {
    pub negative_inventory: usize,
    pub low_stock: usize,
    pub payment_overdue: usize,
}

impl AlertScanSummary {
    pub fn total(&self) -> usize {
        self.negative_inventory + self.low_stock + self.payment_overdue
    }
}

/// Input for moving an alert along its lifecycle
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAlertStatusInput {
    pub status: AlertStatus,
}

/// Subject an alert is deduplicated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AlertKey {
    Stock { product_id: Uuid, location_id: Uuid },
    Store(Uuid),
}

impl AlertKey {
    fn of(alert: &Alert) -> Option<Self> {
        match alert.alert_type {
            AlertType::NegativeInventory | AlertType::LowStock => {
                Some(AlertKey::Stock {
                    product_id: alert.product_id?,
                    location_id: alert.location_id?,
                })
            }
            AlertType::PaymentOverdue => alert.store_id.map(AlertKey::Store),
            AlertType::ShrinkageDetected | AlertType::ReconciliationMismatch => None,
        }
    }
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(store: Arc<dyn LedgerStore>, settings: AlertSettings) -> Self {
        Self { store, settings }
    }

    /// Run every scan against the current time
    pub async fn run_scan(&self) -> AppResult<AlertScanSummary> {
        self.run_scan_at(Utc::now()).await
    }

    /// Run every scan as if it were `now`
    pub async fn run_scan_at(&self, now: DateTime<Utc>) -> AppResult<AlertScanSummary> {
        let movements = self.store.list_movements(&MovementFilter::default()).await?;
        let totals = balances(&movements);

        let products: HashMap<Uuid, String> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .map(|p| (p.id, p.display_name()))
            .collect();
        let locations: HashMap<Uuid, (String, LocationKind)> = self
            .store
            .list_locations()
            .await?
            .into_iter()
            .map(|l| (l.id, (l.name, l.kind)))
            .collect();
        let product_name = |id: &Uuid| products.get(id).cloned().unwrap_or_default();
        let location_name = |id: &Uuid| {
            locations
                .get(id)
                .map(|(name, _)| name.clone())
                .unwrap_or_default()
        };

        let mut summary = AlertScanSummary::default();

        // Negative inventory at any location, in either unit
        let mut open = self.open_keys(AlertType::NegativeInventory).await?;
        for (key, on_hand) in totals.iter().filter(|(_, n)| **n < 0) {
            let dedup = AlertKey::Stock {
                product_id: key.product_id,
                location_id: key.location_id,
            };
            if !open.insert(dedup) {
                continue;
            }

            tracing::warn!(
                product_id = %key.product_id,
                location_id = %key.location_id,
                unit_type = %key.unit_type,
                on_hand = *on_hand,
                "Negative inventory"
            );

            let alert = Alert::open(
                AlertType::NegativeInventory,
                format!(
                    "Negative inventory: {} at {}",
                    product_name(&key.product_id),
                    location_name(&key.location_id)
                ),
                format!(
                    "On-hand is {} {}. Likely a data entry error or an unlogged movement.",
                    on_hand, key.unit_type
                ),
            )
            .with_product(key.product_id)
            .with_location(key.location_id);
            self.raise(&alert).await?;
            summary.negative_inventory += 1;
        }

        // Low box stock at storage locations with history
        let mut open = self.open_keys(AlertType::LowStock).await?;
        for (key, on_hand) in totals.iter() {
            let at_storage = matches!(
                locations.get(&key.location_id),
                Some((_, LocationKind::Storage))
            );
            if key.unit_type != UnitType::Box
                || !at_storage
                || *on_hand < 0
                || *on_hand > self.settings.low_stock_threshold
            {
                continue;
            }

            let dedup = AlertKey::Stock {
                product_id: key.product_id,
                location_id: key.location_id,
            };
            if !open.insert(dedup) {
                continue;
            }

            let alert = Alert::open(
                AlertType::LowStock,
                format!(
                    "Low stock: {} ({} boxes left)",
                    product_name(&key.product_id),
                    on_hand
                ),
                format!(
                    "Only {} boxes remaining at {}. Consider reordering.",
                    on_hand,
                    location_name(&key.location_id)
                ),
            )
            .with_product(key.product_id)
            .with_location(key.location_id);
            self.raise(&alert).await?;
            summary.low_stock += 1;
        }

        // Stores with deliveries and no recent payment
        let delivered: HashSet<Uuid> = movements
            .iter()
            .filter(|m| m.contributes() && m.action == MovementAction::DeliverToStore)
            .filter_map(|m| m.store_id)
            .collect();
        let today = now.date_naive();
        let cutoff = today - chrono::Duration::days(self.settings.payment_overdue_days);

        let mut open = self.open_keys(AlertType::PaymentOverdue).await?;
        for store in self.store.list_stores().await? {
            if !store.is_active() || !delivered.contains(&store.id) {
                continue;
            }

            let last_payment = self
                .store
                .list_payments(store.id)
                .await?
                .into_iter()
                .map(|p| p.payment_date)
                .max();

            let description = match last_payment {
                Some(date) if date >= cutoff => continue,
                Some(date) => format!(
                    "Last payment was {} days ago on {}.",
                    (today - date).num_days(),
                    date
                ),
                None => "No payments on record for this store.".to_string(),
            };

            if !open.insert(AlertKey::Store(store.id)) {
                continue;
            }

            let alert = Alert::open(
                AlertType::PaymentOverdue,
                format!("Payment overdue: {}", store.name),
                description,
            )
            .with_store(store.id);
            self.raise(&alert).await?;
            summary.payment_overdue += 1;
        }

        tracing::info!(
            negative_inventory = summary.negative_inventory,
            low_stock = summary.low_stock,
            payment_overdue = summary.payment_overdue,
            "Alert scan completed"
        );

        Ok(summary)
    }

    /// Acknowledge or resolve an alert
    pub async fn update_status(
        &self,
        actor: &Actor,
        alert_id: Uuid,
        input: UpdateAlertStatusInput,
    ) -> AppResult<Alert> {
        require_role(actor, AppRole::Manager, "Updating alerts")?;

        let mut alert = self
            .store
            .get_alert(alert_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Alert".to_string()))?;

        alert
            .transition(input.status, &actor.user_id, Utc::now())
            .map_err(AppError::InvalidStateTransition)?;

        if !self.store.update_alert_status(&alert).await? {
            return Err(AppError::NotFound("Alert".to_string()));
        }

        tracing::info!(
            alert_id = %alert.id,
            status = %alert.status,
            updated_by = %actor.user_id,
            "Alert status changed"
        );

        Ok(alert)
    }

    pub async fn list_alerts(&self, filter: &AlertFilter) -> AppResult<Vec<Alert>> {
        self.store.list_alerts(filter).await
    }

    async fn open_keys(&self, alert_type: AlertType) -> AppResult<HashSet<AlertKey>> {
        let filter = AlertFilter {
            alert_type: Some(alert_type),
            unresolved_only: true,
            ..Default::default()
        };

        Ok(self
            .store
            .list_alerts(&filter)
            .await?
            .iter()
            .filter_map(AlertKey::of)
            .collect())
    }

    async fn raise(&self, alert: &Alert) -> AppResult<()> {
        self.store.insert_alert(alert).await?;

        tracing::info!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            title = %alert.title,
            "Alert raised"
        );
        Ok(())
    }
}
