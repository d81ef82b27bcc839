//! On-hand projection
//!
//! Current inventory is a fold over the ledger. Nothing here touches storage,
//! so the same functions back the API, the alert scan and the tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::catalog::UnitType;
use super::location::LocationKind;
use super::movement::Movement;

/// Identity of one on-hand figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub unit_type: UnitType,
}

/// One line of an inventory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub unit_type: UnitType,
    pub on_hand: i64,
}

impl From<(StockKey, i64)> for InventoryRow {
    fn from((key, on_hand): (StockKey, i64)) -> Self {
        Self {
            product_id: key.product_id,
            location_id: key.location_id,
            unit_type: key.unit_type,
            on_hand,
        }
    }
}

/// Totals per location kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTotalRow {
    pub product_id: Uuid,
    pub unit_type: UnitType,
    pub location_kind: LocationKind,
    pub on_hand: i64,
}

/// On-hand quantity of a product/unit at a location. May be negative.
pub fn on_hand<'a, I>(movements: I, product_id: Uuid, unit_type: UnitType, location_id: Uuid) -> i64
where
    I: IntoIterator<Item = &'a Movement>,
{
    movements
        .into_iter()
        .filter(|m| m.contributes() && m.product_id == product_id && m.unit_type == unit_type)
        .map(|m| m.delta_at(location_id))
        .sum()
}

/// Every on-hand figure the ledger has touched, including ones that net to zero
pub fn balances<'a, I>(movements: I) -> BTreeMap<StockKey, i64>
where
    I: IntoIterator<Item = &'a Movement>,
{
    let mut totals = BTreeMap::new();

    for m in movements.into_iter().filter(|m| m.contributes()) {
        if let Some(location_id) = m.to_location_id {
            *totals.entry(key(m, location_id)).or_insert(0) += m.quantity;
        }
        if let Some(location_id) = m.from_location_id {
            *totals.entry(key(m, location_id)).or_insert(0) -= m.quantity;
        }
    }

    totals
}

fn key(m: &Movement, location_id: Uuid) -> StockKey {
    StockKey {
        product_id: m.product_id,
        location_id,
        unit_type: m.unit_type,
    }
}

/// Visible inventory: non-zero figures at locations accepted by `include`
pub fn visible_rows<F>(balances: &BTreeMap<StockKey, i64>, include: F) -> Vec<InventoryRow>
where
    F: Fn(Uuid) -> bool,
{
    balances
        .iter()
        .filter(|(key, qty)| **qty != 0 && include(key.location_id))
        .map(|(key, qty)| InventoryRow::from((*key, *qty)))
        .collect()
}

/// Figures below zero, wherever they are
pub fn negative_rows(balances: &BTreeMap<StockKey, i64>) -> Vec<InventoryRow> {
    balances
        .iter()
        .filter(|(_, qty)| **qty < 0)
        .map(|(key, qty)| InventoryRow::from((*key, *qty)))
        .collect()
}

/// Roll figures up by location kind, omitting zero totals.
///
/// Locations `kind_of` cannot place are skipped.
pub fn totals_by_kind<F>(balances: &BTreeMap<StockKey, i64>, kind_of: F) -> Vec<KindTotalRow>
where
    F: Fn(Uuid) -> Option<LocationKind>,
{
    let mut totals: BTreeMap<(Uuid, UnitType, LocationKind), i64> = BTreeMap::new();

    for (key, qty) in balances {
        if let Some(kind) = kind_of(key.location_id) {
            *totals.entry((key.product_id, key.unit_type, kind)).or_insert(0) += qty;
        }
    }

    totals
        .into_iter()
        .filter(|(_, qty)| *qty != 0)
        .map(|((product_id, unit_type, location_kind), on_hand)| KindTotalRow {
            product_id,
            unit_type,
            location_kind,
            on_hand,
        })
        .collect()
}
