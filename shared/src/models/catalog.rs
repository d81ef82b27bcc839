//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::{Lifecycle, UnknownVariant};

/// Unit a quantity is counted in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitType {
    Box,
    Pack,
}

impl UnitType {
    pub const ALL: [UnitType; 2] = [UnitType::Box, UnitType::Pack];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Box => "BOX",
            UnitType::Pack => "PACK",
        }
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOX" => Ok(UnitType::Box),
            "PACK" => Ok(UnitType::Pack),
            other => Err(UnknownVariant::new("unit type", other)),
        }
    }
}

/// A sellable product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub variant: Option<String>,
    pub sku: String,
    /// Fixed at creation; historical conversions depend on it
    pub packs_per_box: i32,
    pub notes: Option<String>,
    pub status: Lifecycle,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// "Name (Variant)" or just the name
    pub fn display_name(&self) -> String {
        match &self.variant {
            Some(variant) => format!("{} ({})", self.name, variant),
            None => self.name.clone(),
        }
    }
}

/// Default pricing for a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductPricing {
    pub product_id: Uuid,
    pub cost_per_box: Decimal,
    pub retail_price_per_pack: Decimal,
    pub retail_price_per_box: Decimal,
    /// Default per-box rate owed by partner stores
    pub wholesale_price_per_box: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Derived unit economics for a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingSummary {
    pub cost_per_box: Decimal,
    pub cost_per_pack: Decimal,
    pub retail_price_per_pack: Decimal,
    pub retail_price_per_box: Decimal,
    pub wholesale_price_per_box: Decimal,
    pub margin_per_pack: Decimal,
    pub margin_per_box: Decimal,
}

impl PricingSummary {
    pub fn derive(pricing: &ProductPricing, packs_per_box: i32) -> Self {
        let cost_per_pack = if packs_per_box > 0 {
            pricing.cost_per_box / Decimal::from(packs_per_box)
        } else {
            Decimal::ZERO
        };

        Self {
            cost_per_box: pricing.cost_per_box,
            cost_per_pack,
            retail_price_per_pack: pricing.retail_price_per_pack,
            retail_price_per_box: pricing.retail_price_per_box,
            wholesale_price_per_box: pricing.wholesale_price_per_box,
            margin_per_pack: pricing.retail_price_per_pack - cost_per_pack,
            margin_per_box: pricing.retail_price_per_box - pricing.cost_per_box,
        }
    }
}

/// Store-specific wholesale price
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorePriceOverride {
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub wholesale_price_per_box: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// A registered barcode identifying one unit type of a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Barcode {
    pub id: Uuid,
    /// Globally unique
    pub value: String,
    pub product_id: Uuid,
    pub unit_type: UnitType,
    pub symbology: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Symbology assumed when none is given at registration
pub const DEFAULT_SYMBOLOGY: &str = "UPC_A";
