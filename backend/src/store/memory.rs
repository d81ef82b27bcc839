//! In-memory ledger store
//!
//! Backs the test suite and the `memory` database backend. Multi-row
//! operations run as transactions under one write lock: rows land in the live
//! tables one at a time, and the first failed write restores the tables to
//! their state before the operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use shared::{
    Alert, AlertFilter, Barcode, Lifecycle, Location, Movement, MovementFilter, Pagination,
    Product, ProductPricing, Store, StoreCount, StorePayment, StorePriceOverride, Vendor,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::LedgerStore;
use crate::error::{AppError, AppResult};

#[derive(Default, Clone)]
struct Tables {
    locations: Vec<Location>,
    stores: Vec<Store>,
    vendors: Vec<Vendor>,
    products: Vec<Product>,
    pricing: HashMap<Uuid, ProductPricing>,
    overrides: HashMap<(Uuid, Uuid), StorePriceOverride>,
    barcodes: HashMap<String, Barcode>,
    movements: Vec<Movement>,
    counts: Vec<StoreCount>,
    payments: Vec<StorePayment>,
    alerts: Vec<Alert>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// 1-based row write to fail in the next multi-row operation; 0 is off
    fail_at: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th row write of the next multi-row operation fail
    pub fn fail_write_at(&self, n: usize) {
        self.fail_at.store(n, Ordering::SeqCst);
    }

    /// Number of ledger rows, reversals included
    pub async fn movement_count(&self) -> usize {
        self.tables.read().await.movements.len()
    }

    fn budget(&self) -> WriteBudget {
        WriteBudget {
            fail_at: self.fail_at.swap(0, Ordering::SeqCst),
            written: 0,
        }
    }
}

impl Tables {
    /// Run `writes` as one transaction; any error rolls every table back
    fn transaction<T>(
        &mut self,
        mut budget: WriteBudget,
        writes: impl FnOnce(&mut Tables, &mut WriteBudget) -> AppResult<T>,
    ) -> AppResult<T> {
        let snapshot = self.clone();
        match writes(self, &mut budget) {
            Ok(value) => Ok(value),
            Err(e) => {
                *self = snapshot;
                Err(e)
            }
        }
    }
}

/// Counts row writes inside one multi-row operation
struct WriteBudget {
    fail_at: usize,
    written: usize,
}

impl WriteBudget {
    fn write(&mut self) -> AppResult<()> {
        self.written += 1;
        if self.written == self.fail_at {
            return Err(AppError::StoreUnavailable(format!(
                "write {} of the transaction failed",
                self.written
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn insert_location(&self, location: &Location) -> AppResult<()> {
        self.tables.write().await.locations.push(location.clone());
        Ok(())
    }

    async fn get_location(&self, id: Uuid) -> AppResult<Option<Location>> {
        let tables = self.tables.read().await;
        Ok(tables.locations.iter().find(|l| l.id == id).cloned())
    }

    async fn list_locations(&self) -> AppResult<Vec<Location>> {
        Ok(self.tables.read().await.locations.clone())
    }

    async fn set_location_status(&self, id: Uuid, status: Lifecycle) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.locations.iter_mut().find(|l| l.id == id) {
            Some(location) => {
                location.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_store(&self, store: &Store, location: &Location) -> AppResult<()> {
        let budget = self.budget();
        let mut tables = self.tables.write().await;

        tables.transaction(budget, |tables, budget| {
            budget.write()?;
            tables.stores.push(store.clone());
            budget.write()?;
            tables.locations.push(location.clone());
            Ok(())
        })
    }

    async fn get_store(&self, id: Uuid) -> AppResult<Option<Store>> {
        let tables = self.tables.read().await;
        Ok(tables.stores.iter().find(|s| s.id == id).cloned())
    }

    async fn list_stores(&self) -> AppResult<Vec<Store>> {
        Ok(self.tables.read().await.stores.clone())
    }

    async fn set_store_status(&self, id: Uuid, status: Lifecycle) -> AppResult<bool> {
        let budget = self.budget();
        let mut tables = self.tables.write().await;

        let Some(position) = tables.stores.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        tables.transaction(budget, |tables, budget| {
            budget.write()?;
            tables.stores[position].status = status;
            for location in tables.locations.iter_mut().filter(|l| l.store_id == Some(id)) {
                budget.write()?;
                location.status = status;
            }
            Ok(true)
        })
    }

    async fn insert_vendor(&self, vendor: &Vendor) -> AppResult<()> {
        self.tables.write().await.vendors.push(vendor.clone());
        Ok(())
    }

    async fn get_vendor(&self, id: Uuid) -> AppResult<Option<Vendor>> {
        let tables = self.tables.read().await;
        Ok(tables.vendors.iter().find(|v| v.id == id).cloned())
    }

    async fn list_vendors(&self) -> AppResult<Vec<Vendor>> {
        Ok(self.tables.read().await.vendors.clone())
    }

    async fn update_vendor(&self, vendor: &Vendor) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.vendors.iter_mut().find(|v| v.id == vendor.id) {
            Some(existing) => {
                *existing = vendor.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_product(
        &self,
        product: &Product,
        pricing: Option<&ProductPricing>,
    ) -> AppResult<()> {
        let budget = self.budget();
        let mut tables = self.tables.write().await;

        if tables.products.iter().any(|p| p.sku == product.sku) {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }
        tables.transaction(budget, |tables, budget| {
            budget.write()?;
            tables.products.push(product.clone());
            if let Some(pricing) = pricing {
                budget.write()?;
                tables.pricing.insert(pricing.product_id, pricing.clone());
            }
            Ok(())
        })
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        Ok(self.tables.read().await.products.clone())
    }

    async fn set_product_status(&self, id: Uuid, status: Lifecycle) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                product.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_pricing(&self, product_id: Uuid) -> AppResult<Option<ProductPricing>> {
        Ok(self.tables.read().await.pricing.get(&product_id).cloned())
    }

    async fn upsert_pricing(&self, pricing: &ProductPricing) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.pricing.insert(pricing.product_id, pricing.clone());
        Ok(())
    }

    async fn get_price_override(
        &self,
        store_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<StorePriceOverride>> {
        let tables = self.tables.read().await;
        Ok(tables.overrides.get(&(store_id, product_id)).cloned())
    }

    async fn upsert_price_override(&self, price: &StorePriceOverride) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .overrides
            .insert((price.store_id, price.product_id), price.clone());
        Ok(())
    }

    async fn insert_barcode(&self, barcode: &Barcode) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.barcodes.contains_key(&barcode.value) {
            return Err(AppError::DuplicateEntry("barcode".to_string()));
        }
        tables.barcodes.insert(barcode.value.clone(), barcode.clone());
        Ok(())
    }

    async fn find_barcode(&self, value: &str) -> AppResult<Option<Barcode>> {
        Ok(self.tables.read().await.barcodes.get(value).cloned())
    }

    async fn append_movements(&self, rows: &[Movement]) -> AppResult<()> {
        let budget = self.budget();
        let mut tables = self.tables.write().await;

        tables.transaction(budget, |tables, budget| {
            for row in rows {
                budget.write()?;
                tables.movements.push(row.clone());
            }
            Ok(())
        })
    }

    async fn append_reversal(&self, reversal: &Movement) -> AppResult<()> {
        let budget = self.budget();
        let mut tables = self.tables.write().await;

        let original_id = reversal
            .reverses_id
            .ok_or_else(|| AppError::Internal("Reversal row without a target".to_string()))?;
        let position = tables
            .movements
            .iter()
            .position(|m| m.id == original_id)
            .ok_or_else(|| AppError::NotFound("Movement".to_string()))?;

        let original = &tables.movements[position];
        if original.reversed_by_id.is_some() || original.is_reversal {
            return Err(AppError::AlreadyReversed(original_id));
        }

        tables.transaction(budget, |tables, budget| {
            budget.write()?;
            tables.movements.push(reversal.clone());
            budget.write()?;
            tables.movements[position].reversed_by_id = Some(reversal.id);
            Ok(())
        })
    }

    async fn get_movement(&self, id: Uuid) -> AppResult<Option<Movement>> {
        let tables = self.tables.read().await;
        Ok(tables.movements.iter().find(|m| m.id == id).cloned())
    }

    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>> {
        let tables = self.tables.read().await;
        Ok(tables
            .movements
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn page_movements(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Movement>, u64)> {
        let tables = self.tables.read().await;
        let matching: Vec<&Movement> = tables
            .movements
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .collect();

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn insert_store_counts(&self, counts: &[StoreCount], alerts: &[Alert]) -> AppResult<()> {
        let budget = self.budget();
        let mut tables = self.tables.write().await;

        tables.transaction(budget, |tables, budget| {
            for count in counts {
                let taken = tables.counts.iter().any(|c| {
                    c.store_id == count.store_id
                        && c.product_id == count.product_id
                        && c.count_date == count.count_date
                });
                if taken {
                    return Err(AppError::DuplicateEntry("store count".to_string()));
                }
                budget.write()?;
                tables.counts.push(count.clone());
            }
            for alert in alerts {
                budget.write()?;
                tables.alerts.push(alert.clone());
            }
            Ok(())
        })
    }

    async fn list_store_counts(&self, store_id: Option<Uuid>) -> AppResult<Vec<StoreCount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .counts
            .iter()
            .filter(|c| store_id.map_or(true, |id| c.store_id == id))
            .cloned()
            .collect())
    }

    async fn insert_payment(&self, payment: &StorePayment) -> AppResult<()> {
        self.tables.write().await.payments.push(payment.clone());
        Ok(())
    }

    async fn list_payments(&self, store_id: Uuid) -> AppResult<Vec<StorePayment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .iter()
            .filter(|p| p.store_id == store_id)
            .cloned()
            .collect())
    }

    async fn insert_alert(&self, alert: &Alert) -> AppResult<()> {
        self.tables.write().await.alerts.push(alert.clone());
        Ok(())
    }

    async fn get_alert(&self, id: Uuid) -> AppResult<Option<Alert>> {
        let tables = self.tables.read().await;
        Ok(tables.alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> AppResult<Vec<Alert>> {
        let tables = self.tables.read().await;
        Ok(tables
            .alerts
            .iter()
            .rev()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn update_alert_status(&self, alert: &Alert) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.alerts.iter_mut().find(|a| a.id == alert.id) {
            Some(existing) => {
                existing.status = alert.status;
                existing.acknowledged_by = alert.acknowledged_by.clone();
                existing.acknowledged_at = alert.acknowledged_at;
                existing.resolved_by = alert.resolved_by.clone();
                existing.resolved_at = alert.resolved_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::{MovementAction, UnitType};

    fn receipt(quantity: i64) -> Movement {
        Movement {
            id: Uuid::new_v4(),
            action: MovementAction::Receive,
            product_id: Uuid::new_v4(),
            unit_type: UnitType::Box,
            quantity,
            from_location_id: None,
            to_location_id: Some(Uuid::new_v4()),
            vendor_id: Some(Uuid::new_v4()),
            store_id: None,
            cost_snapshot: None,
            price_snapshot: None,
            adjustment_reason: None,
            approved_by: None,
            performed_by: "user_1".to_string(),
            notes: None,
            barcode_scanned: None,
            performed_at: Utc::now(),
            is_reversal: false,
            reverses_id: None,
            reversed_by_id: None,
            linked_movement_id: None,
        }
    }

    #[tokio::test]
    async fn test_injected_failure_discards_every_row() {
        let store = MemoryStore::new();
        store.fail_write_at(2);

        let result = store.append_movements(&[receipt(1), receipt(2)]).await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
        assert_eq!(store.movement_count().await, 0);

        // The fault is consumed by the failed operation
        store.append_movements(&[receipt(1), receipt(2)]).await.unwrap();
        assert_eq!(store.movement_count().await, 2);
    }

    #[tokio::test]
    async fn test_late_failure_rolls_back_rows_already_written() {
        let store = MemoryStore::new();
        store.append_movements(&[receipt(7)]).await.unwrap();

        // Rows one and two reach the table before the third write fails
        store.fail_write_at(3);
        let result = store
            .append_movements(&[receipt(1), receipt(2), receipt(3)])
            .await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));

        let rows = store.list_movements(&MovementFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, 7);
    }

    #[tokio::test]
    async fn test_failed_reversal_leaves_original_unstamped() {
        let store = MemoryStore::new();
        let original = receipt(3);
        store.append_movements(&[original.clone()]).await.unwrap();

        // The reversal row is written, the stamp fails
        store.fail_write_at(2);
        let reversal = original.reversal("typo", "manager_1", Utc::now());
        assert!(store.append_reversal(&reversal).await.is_err());

        let stored = store.get_movement(original.id).await.unwrap().unwrap();
        assert_eq!(stored.reversed_by_id, None);
        assert_eq!(store.movement_count().await, 1);
    }

    #[tokio::test]
    async fn test_reversal_stamp_applies_once() {
        let store = MemoryStore::new();
        let original = receipt(3);
        store.append_movements(&[original.clone()]).await.unwrap();

        let first = original.reversal("typo", "manager_1", Utc::now());
        store.append_reversal(&first).await.unwrap();

        let second = original.reversal("typo again", "manager_1", Utc::now());
        let err = store.append_reversal(&second).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyReversed(id) if id == original.id));

        let stored = store.get_movement(original.id).await.unwrap().unwrap();
        assert_eq!(stored.reversed_by_id, Some(first.id));
        assert_eq!(store.movement_count().await, 2);
    }

    #[tokio::test]
    async fn test_pages_are_newest_first() {
        let store = MemoryStore::new();
        let rows: Vec<Movement> = (1..=5).map(receipt).collect();
        store.append_movements(&rows).await.unwrap();

        let pagination = Pagination { page: 1, per_page: 2 };
        let (page, total) = store
            .page_movements(&MovementFilter::default(), &pagination)
            .await
            .unwrap();

        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].quantity, 5);
        assert_eq!(page[1].quantity, 4);
    }
}
