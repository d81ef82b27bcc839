//! Product catalog service: products, lifecycle and barcodes

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{
    clean_optional, validate_barcode_value, validate_sku, Actor, AppRole, Barcode, Lifecycle,
    MovementAction, Product, ProductPricing, UnitType, DEFAULT_SYMBOLOGY,
};
use uuid::Uuid;
use validator::Validate;

use super::pricing::PricingInput;
use crate::error::{AppError, AppResult};
use crate::middleware::require_role;
use crate::store::LedgerStore;

/// Catalog service
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn LedgerStore>,
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub variant: Option<String>,
    pub sku: String,
    #[validate(range(min = 1, message = "Packs per box must be at least 1"))]
    pub packs_per_box: i32,
    pub notes: Option<String>,
    pub pricing: Option<PricingInput>,
}

/// A product with its default pricing
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub pricing: Option<ProductPricing>,
}

/// Input for registering a barcode
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterBarcodeInput {
    pub value: String,
    pub unit_type: UnitType,
    pub symbology: Option<String>,
    pub label: Option<String>,
}

/// What a scanned code resolves to
#[derive(Debug, Clone, Serialize)]
pub struct BarcodeLookup {
    pub barcode: Barcode,
    pub product: Product,
    pub pricing: Option<ProductPricing>,
    /// Actions that can move the scanned unit
    pub actions: Vec<MovementAction>,
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Create a product, with its default pricing when given
    pub async fn create_product(
        &self,
        actor: &Actor,
        mut input: CreateProductInput,
    ) -> AppResult<ProductDetail> {
        require_role(actor, AppRole::Manager, "Creating products")?;

        input.name = input.name.trim().to_string();
        input.sku = input.sku.trim().to_string();
        input.validate()?;
        validate_sku(&input.sku).map_err(|msg| AppError::field("sku", msg))?;
        if let Some(pricing) = &input.pricing {
            pricing.validate()?;
        }

        let product = Product {
            id: Uuid::new_v4(),
            name: input.name,
            variant: clean_optional(input.variant),
            sku: input.sku,
            packs_per_box: input.packs_per_box,
            notes: clean_optional(input.notes),
            status: Lifecycle::Active,
            created_at: Utc::now(),
        };
        let pricing = input.pricing.map(|p| p.into_pricing(product.id));

        self.store
            .insert_product(&product, pricing.as_ref())
            .await?;

        tracing::info!(
            product_id = %product.id,
            sku = %product.sku,
            packs_per_box = product.packs_per_box,
            "Product created"
        );

        Ok(ProductDetail { product, pricing })
    }

    pub async fn get_product(&self, product_id: Uuid) -> AppResult<ProductDetail> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        let pricing = self.store.get_pricing(product_id).await?;

        Ok(ProductDetail { product, pricing })
    }

    /// Products ordered by name; inactive ones only when asked for
    pub async fn list_products(&self, include_inactive: bool) -> AppResult<Vec<Product>> {
        let mut products = self.store.list_products().await?;
        products.retain(|p| include_inactive || p.is_active());
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.variant.cmp(&b.variant)));
        Ok(products)
    }

    pub async fn deactivate_product(&self, actor: &Actor, product_id: Uuid) -> AppResult<()> {
        self.set_status(actor, product_id, Lifecycle::Inactive).await
    }

    pub async fn reactivate_product(&self, actor: &Actor, product_id: Uuid) -> AppResult<()> {
        self.set_status(actor, product_id, Lifecycle::Active).await
    }

    async fn set_status(&self, actor: &Actor, product_id: Uuid, status: Lifecycle) -> AppResult<()> {
        require_role(actor, AppRole::Manager, "Changing product status")?;

        if !self.store.set_product_status(product_id, status).await? {
            return Err(AppError::NotFound("Product".to_string()));
        }

        tracing::info!(product_id = %product_id, status = ?status, "Product status changed");
        Ok(())
    }

    /// Register a globally unique barcode for one unit type of a product
    pub async fn register_barcode(
        &self,
        actor: &Actor,
        product_id: Uuid,
        input: RegisterBarcodeInput,
    ) -> AppResult<Barcode> {
        require_role(actor, AppRole::Manager, "Registering barcodes")?;

        let value = input.value.trim().to_string();
        validate_barcode_value(&value).map_err(|msg| AppError::field("value", msg))?;

        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        if self.store.find_barcode(&value).await?.is_some() {
            return Err(AppError::DuplicateEntry("barcode".to_string()));
        }

        let barcode = Barcode {
            id: Uuid::new_v4(),
            value,
            product_id,
            unit_type: input.unit_type,
            symbology: clean_optional(input.symbology)
                .unwrap_or_else(|| DEFAULT_SYMBOLOGY.to_string()),
            label: clean_optional(input.label),
            created_at: Utc::now(),
        };
        self.store.insert_barcode(&barcode).await?;

        tracing::info!(
            product_id = %product_id,
            barcode = %barcode.value,
            unit_type = %barcode.unit_type,
            "Barcode registered"
        );

        Ok(barcode)
    }

    /// Resolve a scanned value to its product, unit type and pricing
    pub async fn lookup_barcode(&self, value: &str) -> AppResult<BarcodeLookup> {
        let barcode = self
            .store
            .find_barcode(value.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Barcode".to_string()))?;

        let product = self
            .store
            .get_product(barcode.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        let pricing = self.store.get_pricing(product.id).await?;
        let actions = MovementAction::for_scanned_unit(barcode.unit_type);

        Ok(BarcodeLookup {
            barcode,
            product,
            pricing,
            actions,
        })
    }
}
