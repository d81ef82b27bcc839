//! Pricing resolution and maintenance

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{Actor, AppRole, PricingSummary, ProductPricing, StorePriceOverride};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::require_role;
use crate::store::LedgerStore;

/// Pricing service
#[derive(Clone)]
pub struct PricingService {
    store: Arc<dyn LedgerStore>,
}

/// Default pricing for a product
#[derive(Debug, Clone, Deserialize)]
pub struct PricingInput {
    pub cost_per_box: Decimal,
    #[serde(default)]
    pub retail_price_per_pack: Decimal,
    #[serde(default)]
    pub retail_price_per_box: Decimal,
    #[serde(default)]
    pub wholesale_price_per_box: Decimal,
}

impl PricingInput {
    pub(crate) fn validate(&self) -> AppResult<()> {
        non_negative("cost_per_box", self.cost_per_box)?;
        non_negative("retail_price_per_pack", self.retail_price_per_pack)?;
        non_negative("retail_price_per_box", self.retail_price_per_box)?;
        non_negative("wholesale_price_per_box", self.wholesale_price_per_box)
    }

    pub(crate) fn into_pricing(self, product_id: Uuid) -> ProductPricing {
        ProductPricing {
            product_id,
            cost_per_box: self.cost_per_box,
            retail_price_per_pack: self.retail_price_per_pack,
            retail_price_per_box: self.retail_price_per_box,
            wholesale_price_per_box: self.wholesale_price_per_box,
            updated_at: Utc::now(),
        }
    }
}

/// Input for a store-specific wholesale price
#[derive(Debug, Clone, Deserialize)]
pub struct StorePriceInput {
    pub wholesale_price_per_box: Decimal,
}

pub(crate) fn non_negative(field: &str, value: Decimal) -> AppResult<()> {
    if value < Decimal::ZERO {
        return Err(AppError::field(field, format!("{} cannot be negative", field)));
    }
    Ok(())
}

impl PricingService {
    /// Create a new PricingService instance
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Wholesale price per box a store owes for a product.
    ///
    /// A store override wins over the product default; neither is an error.
    pub async fn wholesale_price(&self, product_id: Uuid, store_id: Uuid) -> AppResult<Decimal> {
        if let Some(price) = self.store.get_price_override(store_id, product_id).await? {
            return Ok(price.wholesale_price_per_box);
        }

        self.store
            .get_pricing(product_id)
            .await?
            .map(|pricing| pricing.wholesale_price_per_box)
            .ok_or(AppError::PricingMissing(product_id))
    }

    /// Cost per pack and margins derived from the default pricing
    pub async fn pricing_summary(&self, product_id: Uuid) -> AppResult<PricingSummary> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let pricing = self
            .store
            .get_pricing(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pricing".to_string()))?;

        Ok(PricingSummary::derive(&pricing, product.packs_per_box))
    }

    /// Replace a product's default pricing. Historical snapshots are untouched.
    pub async fn set_product_pricing(
        &self,
        actor: &Actor,
        product_id: Uuid,
        input: PricingInput,
    ) -> AppResult<ProductPricing> {
        require_role(actor, AppRole::Manager, "Setting prices")?;
        input.validate()?;

        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let pricing = input.into_pricing(product_id);
        self.store.upsert_pricing(&pricing).await?;

        tracing::info!(
            product_id = %product_id,
            wholesale = %pricing.wholesale_price_per_box,
            "Product pricing updated"
        );

        Ok(pricing)
    }

    /// Set the wholesale price one store pays for a product
    pub async fn set_store_price(
        &self,
        actor: &Actor,
        store_id: Uuid,
        product_id: Uuid,
        input: StorePriceInput,
    ) -> AppResult<StorePriceOverride> {
        require_role(actor, AppRole::Manager, "Setting prices")?;
        non_negative("wholesale_price_per_box", input.wholesale_price_per_box)?;

        self.store
            .get_store(store_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Store".to_string()))?;
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let price = StorePriceOverride {
            store_id,
            product_id,
            wholesale_price_per_box: input.wholesale_price_per_box,
            updated_at: Utc::now(),
        };
        self.store.upsert_price_override(&price).await?;

        tracing::info!(
            store_id = %store_id,
            product_id = %product_id,
            wholesale = %price.wholesale_price_per_box,
            "Store price override set"
        );

        Ok(price)
    }
}
