//! On-hand inventory projections
//!
//! Every figure is folded from the ledger on request; nothing is cached.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use shared::{
    balances, negative_rows, on_hand, totals_by_kind, visible_rows, InventoryRow, KindTotalRow,
    Location, LocationKind, MovementFilter, Product, UnitType,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::store::LedgerStore;

/// Inventory service
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn LedgerStore>,
}

/// An inventory row with display names attached
#[derive(Debug, Clone, Serialize)]
pub struct InventoryLine {
    #[serde(flatten)]
    pub row: InventoryRow,
    pub product_name: String,
    pub sku: String,
    pub location_name: String,
    pub location_kind: LocationKind,
}

struct Names {
    products: HashMap<Uuid, Product>,
    locations: HashMap<Uuid, Location>,
}

impl Names {
    fn line(&self, row: InventoryRow) -> InventoryLine {
        let product = self.products.get(&row.product_id);
        let location = self.locations.get(&row.location_id);

        InventoryLine {
            product_name: product.map(Product::display_name).unwrap_or_default(),
            sku: product.map(|p| p.sku.clone()).unwrap_or_default(),
            location_name: location.map(|l| l.name.clone()).unwrap_or_default(),
            location_kind: location.map_or(LocationKind::Storage, |l| l.kind),
            row,
        }
    }
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// On-hand quantity of a product/unit at one location. May be negative.
    pub async fn on_hand(
        &self,
        product_id: Uuid,
        unit_type: UnitType,
        location_id: Uuid,
    ) -> AppResult<i64> {
        let filter = MovementFilter {
            product_id: Some(product_id),
            unit_type: Some(unit_type),
            location_id: Some(location_id),
            ..Default::default()
        };
        let movements = self.store.list_movements(&filter).await?;

        Ok(on_hand(&movements, product_id, unit_type, location_id))
    }

    /// Every non-zero (product, location, unit) figure at active locations
    pub async fn full_inventory(&self) -> AppResult<Vec<InventoryRow>> {
        let movements = self.store.list_movements(&MovementFilter::default()).await?;
        let locations = self.store.list_locations().await?;

        let active: HashMap<Uuid, bool> = locations
            .iter()
            .map(|l| (l.id, l.is_active()))
            .collect();

        let totals = balances(&movements);
        Ok(visible_rows(&totals, |id| {
            active.get(&id).copied().unwrap_or(false)
        }))
    }

    /// Full inventory with product and location names, ordered for display
    pub async fn inventory_report(&self) -> AppResult<Vec<InventoryLine>> {
        let rows = self.full_inventory().await?;
        let names = self.names().await?;

        let mut lines: Vec<InventoryLine> = rows.into_iter().map(|r| names.line(r)).collect();
        lines.sort_by(|a, b| {
            a.product_name
                .cmp(&b.product_name)
                .then_with(|| a.location_kind.cmp(&b.location_kind))
                .then_with(|| a.location_name.cmp(&b.location_name))
        });
        Ok(lines)
    }

    /// Totals per (product, unit, location kind), zero totals omitted
    pub async fn inventory_by_kind(&self) -> AppResult<Vec<KindTotalRow>> {
        let movements = self.store.list_movements(&MovementFilter::default()).await?;
        let kinds: HashMap<Uuid, LocationKind> = self
            .store
            .list_locations()
            .await?
            .into_iter()
            .map(|l| (l.id, l.kind))
            .collect();

        let totals = balances(&movements);
        Ok(totals_by_kind(&totals, |id| kinds.get(&id).copied()))
    }

    /// Every figure below zero, at any location and in either unit
    pub async fn negative_inventory(&self) -> AppResult<Vec<InventoryLine>> {
        let movements = self.store.list_movements(&MovementFilter::default()).await?;
        let rows = negative_rows(&balances(&movements));
        let names = self.names().await?;

        Ok(rows.into_iter().map(|r| names.line(r)).collect())
    }

    async fn names(&self) -> AppResult<Names> {
        let products = self
            .store
            .list_products()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let locations = self
            .store
            .list_locations()
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();

        Ok(Names {
            products,
            locations,
        })
    }
}
