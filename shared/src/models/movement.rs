//! Movement ledger models
//!
//! A movement is one immutable ledger row. Quantities enter the `to` location
//! and leave the `from` location; current inventory is always derived from the
//! rows, never stored.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::catalog::UnitType;
use super::location::LocationKind;
use crate::types::UnknownVariant;

/// What a ledger row records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementAction {
    Receive,
    PutOnShelf,
    TakeOffShelf,
    DeliverToStore,
    ReturnFromStore,
    ConvertBoxToPacks,
    SaleRetailPack,
    SaleRetailBox,
    Adjustment,
}

impl MovementAction {
    pub const ALL: [MovementAction; 9] = [
        MovementAction::Receive,
        MovementAction::PutOnShelf,
        MovementAction::TakeOffShelf,
        MovementAction::DeliverToStore,
        MovementAction::ReturnFromStore,
        MovementAction::ConvertBoxToPacks,
        MovementAction::SaleRetailPack,
        MovementAction::SaleRetailBox,
        MovementAction::Adjustment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementAction::Receive => "RECEIVE",
            MovementAction::PutOnShelf => "PUT_ON_SHELF",
            MovementAction::TakeOffShelf => "TAKE_OFF_SHELF",
            MovementAction::DeliverToStore => "DELIVER_TO_STORE",
            MovementAction::ReturnFromStore => "RETURN_FROM_STORE",
            MovementAction::ConvertBoxToPacks => "CONVERT_BOX_TO_PACKS",
            MovementAction::SaleRetailPack => "SALE_RETAIL_PACK",
            MovementAction::SaleRetailBox => "SALE_RETAIL_BOX",
            MovementAction::Adjustment => "ADJUSTMENT",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            MovementAction::Receive => "Receive from Vendor",
            MovementAction::PutOnShelf => "Put on Shelf",
            MovementAction::TakeOffShelf => "Take off Shelf",
            MovementAction::DeliverToStore => "Deliver to Store",
            MovementAction::ReturnFromStore => "Return from Store",
            MovementAction::ConvertBoxToPacks => "Convert Box to Packs",
            MovementAction::SaleRetailPack => "Sell Packs (Retail)",
            MovementAction::SaleRetailBox => "Sell Box (Retail)",
            MovementAction::Adjustment => "Adjustment",
        }
    }

    /// Location and unit rule for this action
    pub fn rule(&self) -> ActionRule {
        use LocationKind::*;

        const ANY: &[LocationKind] = &[Storage, Shelf, Truck, Store];
        const BOXES: &[UnitType] = &[UnitType::Box];
        const PACKS: &[UnitType] = &[UnitType::Pack];
        const EITHER: &[UnitType] = &[UnitType::Box, UnitType::Pack];

        match self {
            MovementAction::Receive => ActionRule {
                from: SideRule::Absent,
                to: SideRule::Required(&[Storage]),
                sides: SideArity::AsDeclared,
                units: BOXES,
            },
            MovementAction::PutOnShelf => ActionRule {
                from: SideRule::Required(&[Storage]),
                to: SideRule::Required(&[Shelf]),
                sides: SideArity::AsDeclared,
                units: EITHER,
            },
            MovementAction::TakeOffShelf => ActionRule {
                from: SideRule::Required(&[Shelf]),
                to: SideRule::Required(&[Storage, Truck]),
                sides: SideArity::AsDeclared,
                units: EITHER,
            },
            MovementAction::DeliverToStore => ActionRule {
                from: SideRule::Required(&[Storage, Shelf, Truck]),
                to: SideRule::Required(&[Store]),
                sides: SideArity::AsDeclared,
                units: BOXES,
            },
            MovementAction::ReturnFromStore => ActionRule {
                from: SideRule::Required(&[Store]),
                to: SideRule::Required(&[Storage, Truck]),
                sides: SideArity::AsDeclared,
                units: BOXES,
            },
            MovementAction::ConvertBoxToPacks => ActionRule {
                from: SideRule::Required(&[Storage, Shelf]),
                to: SideRule::Required(&[Storage, Shelf]),
                sides: SideArity::SameLocation,
                units: BOXES,
            },
            MovementAction::SaleRetailPack => ActionRule {
                from: SideRule::Required(&[Shelf, Storage]),
                to: SideRule::Absent,
                sides: SideArity::AsDeclared,
                units: PACKS,
            },
            MovementAction::SaleRetailBox => ActionRule {
                from: SideRule::Required(&[Shelf, Storage]),
                to: SideRule::Absent,
                sides: SideArity::AsDeclared,
                units: BOXES,
            },
            MovementAction::Adjustment => ActionRule {
                from: SideRule::Optional(ANY),
                to: SideRule::Optional(ANY),
                sides: SideArity::ExactlyOne,
                units: EITHER,
            },
        }
    }

    /// Actions offered when a barcode of the given unit type is scanned.
    /// Adjustments are entered by a manager, never from a scan.
    pub fn for_scanned_unit(unit_type: UnitType) -> Vec<MovementAction> {
        Self::ALL
            .into_iter()
            .filter(|action| *action != MovementAction::Adjustment)
            .filter(|action| action.rule().units.contains(&unit_type))
            .collect()
    }
}

impl std::fmt::Display for MovementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("movement action", s))
    }
}

/// Constraint on one side (`from` or `to`) of a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideRule {
    /// The side must be empty
    Absent,
    /// The side must be filled with one of these kinds
    Required(&'static [LocationKind]),
    /// The side may be empty or one of these kinds
    Optional(&'static [LocationKind]),
}

impl SideRule {
    pub fn allows(&self, kind: Option<LocationKind>) -> bool {
        match (self, kind) {
            (SideRule::Absent, None) => true,
            (SideRule::Absent, Some(_)) => false,
            (SideRule::Required(_), None) => false,
            (SideRule::Required(kinds), Some(kind)) => kinds.contains(&kind),
            (SideRule::Optional(_), None) => true,
            (SideRule::Optional(kinds), Some(kind)) => kinds.contains(&kind),
        }
    }
}

/// Additional constraint relating the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideArity {
    /// Each side follows its own rule
    AsDeclared,
    /// Exactly one of `from`/`to` is filled (adjustments)
    ExactlyOne,
    /// Both sides name the same location (conversions)
    SameLocation,
}

/// Static rule declared for every action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRule {
    pub from: SideRule,
    pub to: SideRule,
    pub sides: SideArity,
    pub units: &'static [UnitType],
}

/// One immutable ledger row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movement {
    pub id: Uuid,
    pub action: MovementAction,
    pub product_id: Uuid,
    pub unit_type: UnitType,
    /// Always positive; direction comes from `from`/`to`
    pub quantity: i64,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    /// Cost per box frozen at receipt
    pub cost_snapshot: Option<Decimal>,
    /// Wholesale price per box for deliveries, total price for retail sales
    pub price_snapshot: Option<Decimal>,
    pub adjustment_reason: Option<String>,
    pub approved_by: Option<String>,
    pub performed_by: String,
    pub notes: Option<String>,
    pub barcode_scanned: Option<String>,
    pub performed_at: DateTime<Utc>,
    pub is_reversal: bool,
    pub reverses_id: Option<Uuid>,
    /// Set once on the original when it is reversed
    pub reversed_by_id: Option<Uuid>,
    /// Pack row of a conversion points at its box row
    pub linked_movement_id: Option<Uuid>,
}

impl Movement {
    /// Whether this row counts towards on-hand and billing.
    ///
    /// A reversed original and its reversal row cancel each other, so both are
    /// left out.
    pub fn contributes(&self) -> bool {
        self.reversed_by_id.is_none() && !self.is_reversal
    }

    /// Signed effect of this row on `location_id`
    pub fn delta_at(&self, location_id: Uuid) -> i64 {
        let mut delta = 0;
        if self.to_location_id == Some(location_id) {
            delta += self.quantity;
        }
        if self.from_location_id == Some(location_id) {
            delta -= self.quantity;
        }
        delta
    }

    /// Calendar day (UTC) the movement happened on
    pub fn performed_on(&self) -> NaiveDate {
        self.performed_at.date_naive()
    }

    /// Build the compensating row for this movement
    pub fn reversal(&self, reason: &str, performed_by: &str, at: DateTime<Utc>) -> Movement {
        Movement {
            id: Uuid::new_v4(),
            action: self.action,
            product_id: self.product_id,
            unit_type: self.unit_type,
            quantity: self.quantity,
            from_location_id: self.to_location_id,
            to_location_id: self.from_location_id,
            vendor_id: self.vendor_id,
            store_id: self.store_id,
            cost_snapshot: self.cost_snapshot,
            price_snapshot: self.price_snapshot,
            adjustment_reason: None,
            approved_by: None,
            performed_by: performed_by.to_string(),
            notes: Some(format!("REVERSAL: {}", reason)),
            barcode_scanned: None,
            performed_at: at,
            is_reversal: true,
            reverses_id: Some(self.id),
            reversed_by_id: None,
            linked_movement_id: None,
        }
    }
}

/// Direction of a manual adjustment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentDirection {
    Add,
    Remove,
}

impl AdjustmentDirection {
    /// Source and destination of an adjustment at one location
    pub fn sides(self, location_id: Uuid) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            AdjustmentDirection::Add => (None, Some(location_id)),
            AdjustmentDirection::Remove => (Some(location_id), None),
        }
    }
}

/// Query over the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementFilter {
    pub action: Option<MovementAction>,
    pub product_id: Option<Uuid>,
    pub unit_type: Option<UnitType>,
    /// Matches rows where the location is either side
    pub location_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    /// Include rows that are themselves reversals
    #[serde(default = "default_true")]
    pub include_reversals: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MovementFilter {
    fn default() -> Self {
        Self {
            action: None,
            product_id: None,
            unit_type: None,
            location_id: None,
            store_id: None,
            include_reversals: true,
        }
    }
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement) -> bool {
        self.action.map_or(true, |a| movement.action == a)
            && self.product_id.map_or(true, |p| movement.product_id == p)
            && self.unit_type.map_or(true, |u| movement.unit_type == u)
            && self.location_id.map_or(true, |l| {
                movement.from_location_id == Some(l) || movement.to_location_id == Some(l)
            })
            && self.store_id.map_or(true, |s| movement.store_id == Some(s))
            && (self.include_reversals || !movement.is_reversal)
    }
}
