//! Persistence seam for the ledger
//!
//! Services hold an `Arc<dyn LedgerStore>` and never see a connection pool.
//! The store only persists; every business rule lives in the services. No
//! operation updates or deletes a movement, count or payment apart from the
//! one-time reversal stamp inside [`LedgerStore::append_reversal`].

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    Alert, AlertFilter, Barcode, Lifecycle, Location, Movement, MovementFilter, Pagination,
    Product, ProductPricing, Store, StoreCount, StorePayment, StorePriceOverride, Vendor,
};
use uuid::Uuid;

use crate::config::{Config, StoreBackend};
use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Round-trip to the backing store
    async fn ping(&self) -> AppResult<()>;

    // ------------------------------------------------------------------
    // Location graph
    // ------------------------------------------------------------------

    async fn insert_location(&self, location: &Location) -> AppResult<()>;
    async fn get_location(&self, id: Uuid) -> AppResult<Option<Location>>;
    async fn list_locations(&self) -> AppResult<Vec<Location>>;
    /// Returns false when no such location exists
    async fn set_location_status(&self, id: Uuid, status: Lifecycle) -> AppResult<bool>;

    // ------------------------------------------------------------------
    // Partners
    // ------------------------------------------------------------------

    /// Insert a store together with its store location, atomically
    async fn insert_store(&self, store: &Store, location: &Location) -> AppResult<()>;
    async fn get_store(&self, id: Uuid) -> AppResult<Option<Store>>;
    async fn list_stores(&self) -> AppResult<Vec<Store>>;
    /// Toggle a store and every location linked to it, atomically
    async fn set_store_status(&self, id: Uuid, status: Lifecycle) -> AppResult<bool>;

    async fn insert_vendor(&self, vendor: &Vendor) -> AppResult<()>;
    async fn get_vendor(&self, id: Uuid) -> AppResult<Option<Vendor>>;
    async fn list_vendors(&self) -> AppResult<Vec<Vendor>>;
    /// Replace every mutable vendor field; false when missing
    async fn update_vendor(&self, vendor: &Vendor) -> AppResult<bool>;

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Insert a product and its optional pricing, atomically.
    /// A taken SKU fails with `DuplicateEntry("sku")`.
    async fn insert_product(&self, product: &Product, pricing: Option<&ProductPricing>)
        -> AppResult<()>;
    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>>;
    async fn list_products(&self) -> AppResult<Vec<Product>>;
    async fn set_product_status(&self, id: Uuid, status: Lifecycle) -> AppResult<bool>;

    async fn get_pricing(&self, product_id: Uuid) -> AppResult<Option<ProductPricing>>;
    async fn upsert_pricing(&self, pricing: &ProductPricing) -> AppResult<()>;
    async fn get_price_override(
        &self,
        store_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<StorePriceOverride>>;
    async fn upsert_price_override(&self, price: &StorePriceOverride) -> AppResult<()>;

    /// A taken value fails with `DuplicateEntry("barcode")`
    async fn insert_barcode(&self, barcode: &Barcode) -> AppResult<()>;
    async fn find_barcode(&self, value: &str) -> AppResult<Option<Barcode>>;

    // ------------------------------------------------------------------
    // Movement ledger
    // ------------------------------------------------------------------

    /// Persist every row or none
    async fn append_movements(&self, rows: &[Movement]) -> AppResult<()>;

    /// Insert `reversal` and stamp `reversed_by_id` on the row it reverses, in
    /// one transaction. The stamp only applies to an unreversed, non-reversal
    /// original; otherwise nothing is written and `AlreadyReversed` is returned.
    async fn append_reversal(&self, reversal: &Movement) -> AppResult<()>;

    async fn get_movement(&self, id: Uuid) -> AppResult<Option<Movement>>;

    /// Every matching row in ledger order (oldest first)
    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>>;

    /// One page of matching rows, newest first, plus the total match count
    async fn page_movements(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Movement>, u64)>;

    // ------------------------------------------------------------------
    // Store counts and payments
    // ------------------------------------------------------------------

    /// Insert one submission's counts with the alerts they raised, atomically.
    /// A second count for the same (store, product, date) fails the whole
    /// batch with `DuplicateEntry`.
    async fn insert_store_counts(&self, counts: &[StoreCount], alerts: &[Alert]) -> AppResult<()>;
    async fn list_store_counts(&self, store_id: Option<Uuid>) -> AppResult<Vec<StoreCount>>;

    async fn insert_payment(&self, payment: &StorePayment) -> AppResult<()>;
    async fn list_payments(&self, store_id: Uuid) -> AppResult<Vec<StorePayment>>;

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    async fn insert_alert(&self, alert: &Alert) -> AppResult<()>;
    async fn get_alert(&self, id: Uuid) -> AppResult<Option<Alert>>;
    /// Newest first
    async fn list_alerts(&self, filter: &AlertFilter) -> AppResult<Vec<Alert>>;
    /// Persist a status transition and its stamps; false when missing
    async fn update_alert_status(&self, alert: &Alert) -> AppResult<bool>;
}

/// Build the store named by the configuration
pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn LedgerStore>> {
    match config.database.backend {
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database).await?;

            // Run migrations in development
            if config.environment == "development" {
                tracing::info!("Running database migrations...");
                store.migrate().await?;
                tracing::info!("Migrations completed");
            }

            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
