//! PostgreSQL ledger store
//!
//! Enum columns are stored as TEXT and parsed on the way out; lifecycle is an
//! `is_active` flag. Multi-row operations run inside `pool.begin()` /
//! `tx.commit()` so a failure rolls every row back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    Alert, AlertFilter, Barcode, Lifecycle, Location, Movement, MovementFilter, Pagination,
    Product, ProductPricing, Store, StoreCount, StorePayment, StorePriceOverride, Vendor,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use super::LedgerStore;
use crate::config::DatabaseConfig;
use crate::error::{map_unique_violation, AppError, AppResult};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        tracing::info!("Connecting to database...");
        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.url)
            .await?;
        tracing::info!("Database connection established");

        Ok(Self::new(db))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.db).await
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct LocationRow {
    id: Uuid,
    name: String,
    kind: String,
    parent_id: Option<Uuid>,
    store_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<LocationRow> for Location {
    type Error = AppError;

    fn try_from(row: LocationRow) -> AppResult<Self> {
        Ok(Location {
            id: row.id,
            name: row.name,
            kind: row.kind.parse()?,
            parent_id: row.parent_id,
            store_id: row.store_id,
            status: Lifecycle::from_active(row.is_active),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct StoreRow {
    id: Uuid,
    name: String,
    contact_name: Option<String>,
    contact_phone: Option<String>,
    address: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Store {
            id: row.id,
            name: row.name,
            contact_name: row.contact_name,
            contact_phone: row.contact_phone,
            address: row.address,
            status: Lifecycle::from_active(row.is_active),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct VendorRow {
    id: Uuid,
    name: String,
    contact_name: Option<String>,
    contact_phone: Option<String>,
    contact_email: Option<String>,
    notes: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<VendorRow> for Vendor {
    fn from(row: VendorRow) -> Self {
        Vendor {
            id: row.id,
            name: row.name,
            contact_name: row.contact_name,
            contact_phone: row.contact_phone,
            contact_email: row.contact_email,
            notes: row.notes,
            status: Lifecycle::from_active(row.is_active),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    variant: Option<String>,
    sku: String,
    packs_per_box: i32,
    notes: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            variant: row.variant,
            sku: row.sku,
            packs_per_box: row.packs_per_box,
            notes: row.notes,
            status: Lifecycle::from_active(row.is_active),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PricingRow {
    product_id: Uuid,
    cost_per_box: Decimal,
    retail_price_per_pack: Decimal,
    retail_price_per_box: Decimal,
    wholesale_price_per_box: Decimal,
    updated_at: DateTime<Utc>,
}

impl From<PricingRow> for ProductPricing {
    fn from(row: PricingRow) -> Self {
        ProductPricing {
            product_id: row.product_id,
            cost_per_box: row.cost_per_box,
            retail_price_per_pack: row.retail_price_per_pack,
            retail_price_per_box: row.retail_price_per_box,
            wholesale_price_per_box: row.wholesale_price_per_box,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OverrideRow {
    store_id: Uuid,
    product_id: Uuid,
    wholesale_price_per_box: Decimal,
    updated_at: DateTime<Utc>,
}

impl From<OverrideRow> for StorePriceOverride {
    fn from(row: OverrideRow) -> Self {
        StorePriceOverride {
            store_id: row.store_id,
            product_id: row.product_id,
            wholesale_price_per_box: row.wholesale_price_per_box,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BarcodeRow {
    id: Uuid,
    value: String,
    product_id: Uuid,
    unit_type: String,
    symbology: String,
    label: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BarcodeRow> for Barcode {
    type Error = AppError;

    fn try_from(row: BarcodeRow) -> AppResult<Self> {
        Ok(Barcode {
            id: row.id,
            value: row.value,
            product_id: row.product_id,
            unit_type: row.unit_type.parse()?,
            symbology: row.symbology,
            label: row.label,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    action: String,
    product_id: Uuid,
    unit_type: String,
    quantity: i64,
    from_location_id: Option<Uuid>,
    to_location_id: Option<Uuid>,
    vendor_id: Option<Uuid>,
    store_id: Option<Uuid>,
    cost_snapshot: Option<Decimal>,
    price_snapshot: Option<Decimal>,
    adjustment_reason: Option<String>,
    approved_by: Option<String>,
    performed_by: String,
    notes: Option<String>,
    barcode_scanned: Option<String>,
    performed_at: DateTime<Utc>,
    is_reversal: bool,
    reverses_id: Option<Uuid>,
    reversed_by_id: Option<Uuid>,
    linked_movement_id: Option<Uuid>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> AppResult<Self> {
        Ok(Movement {
            id: row.id,
            action: row.action.parse()?,
            product_id: row.product_id,
            unit_type: row.unit_type.parse()?,
            quantity: row.quantity,
            from_location_id: row.from_location_id,
            to_location_id: row.to_location_id,
            vendor_id: row.vendor_id,
            store_id: row.store_id,
            cost_snapshot: row.cost_snapshot,
            price_snapshot: row.price_snapshot,
            adjustment_reason: row.adjustment_reason,
            approved_by: row.approved_by,
            performed_by: row.performed_by,
            notes: row.notes,
            barcode_scanned: row.barcode_scanned,
            performed_at: row.performed_at,
            is_reversal: row.is_reversal,
            reverses_id: row.reverses_id,
            reversed_by_id: row.reversed_by_id,
            linked_movement_id: row.linked_movement_id,
        })
    }
}

#[derive(Debug, FromRow)]
struct StoreCountRow {
    id: Uuid,
    store_id: Uuid,
    product_id: Uuid,
    count_date: NaiveDate,
    boxes_remaining: i64,
    counted_by: String,
    created_at: DateTime<Utc>,
}

impl From<StoreCountRow> for StoreCount {
    fn from(row: StoreCountRow) -> Self {
        StoreCount {
            id: row.id,
            store_id: row.store_id,
            product_id: row.product_id,
            count_date: row.count_date,
            boxes_remaining: row.boxes_remaining,
            counted_by: row.counted_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    store_id: Uuid,
    amount: Decimal,
    payment_date: NaiveDate,
    payment_method: Option<String>,
    notes: Option<String>,
    collected_by: String,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for StorePayment {
    fn from(row: PaymentRow) -> Self {
        StorePayment {
            id: row.id,
            store_id: row.store_id,
            amount: row.amount,
            payment_date: row.payment_date,
            payment_method: row.payment_method,
            notes: row.notes,
            collected_by: row.collected_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    alert_type: String,
    severity: String,
    title: String,
    description: String,
    product_id: Option<Uuid>,
    store_id: Option<Uuid>,
    location_id: Option<Uuid>,
    status: String,
    acknowledged_by: Option<String>,
    acknowledged_at: Option<DateTime<Utc>>,
    resolved_by: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = AppError;

    fn try_from(row: AlertRow) -> AppResult<Self> {
        Ok(Alert {
            id: row.id,
            alert_type: row.alert_type.parse()?,
            severity: row.severity.parse()?,
            title: row.title,
            description: row.description,
            product_id: row.product_id,
            store_id: row.store_id,
            location_id: row.location_id,
            status: row.status.parse()?,
            acknowledged_by: row.acknowledged_by,
            acknowledged_at: row.acknowledged_at,
            resolved_by: row.resolved_by,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ============================================================================
// Statements
// ============================================================================

const LOCATION_COLUMNS: &str = "id, name, kind, parent_id, store_id, is_active, created_at";

const MOVEMENT_COLUMNS: &str = r#"
    id, action, product_id, unit_type, quantity, from_location_id, to_location_id,
    vendor_id, store_id, cost_snapshot, price_snapshot, adjustment_reason, approved_by,
    performed_by, notes, barcode_scanned, performed_at, is_reversal, reverses_id,
    reversed_by_id, linked_movement_id
"#;

/// Binds $1..$6 from a `MovementFilter`
const MOVEMENT_FILTER: &str = r#"
    ($1::text IS NULL OR action = $1)
    AND ($2::uuid IS NULL OR product_id = $2)
    AND ($3::text IS NULL OR unit_type = $3)
    AND ($4::uuid IS NULL OR from_location_id = $4 OR to_location_id = $4)
    AND ($5::uuid IS NULL OR store_id = $5)
    AND ($6 OR NOT is_reversal)
"#;

const ALERT_COLUMNS: &str = r#"
    id, alert_type, severity, title, description, product_id, store_id, location_id,
    status, acknowledged_by, acknowledged_at, resolved_by, resolved_at, created_at
"#;

async fn insert_location<'e, E: PgExecutor<'e>>(
    executor: E,
    location: &Location,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO locations (id, name, kind, parent_id, store_id, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(location.id)
    .bind(&location.name)
    .bind(location.kind.as_str())
    .bind(location.parent_id)
    .bind(location.store_id)
    .bind(location.is_active())
    .bind(location.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

async fn insert_movement<'e, E: PgExecutor<'e>>(
    executor: E,
    m: &Movement,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO movements (
            id, action, product_id, unit_type, quantity, from_location_id, to_location_id,
            vendor_id, store_id, cost_snapshot, price_snapshot, adjustment_reason, approved_by,
            performed_by, notes, barcode_scanned, performed_at, is_reversal, reverses_id,
            reversed_by_id, linked_movement_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21)
        "#,
    )
    .bind(m.id)
    .bind(m.action.as_str())
    .bind(m.product_id)
    .bind(m.unit_type.as_str())
    .bind(m.quantity)
    .bind(m.from_location_id)
    .bind(m.to_location_id)
    .bind(m.vendor_id)
    .bind(m.store_id)
    .bind(m.cost_snapshot)
    .bind(m.price_snapshot)
    .bind(&m.adjustment_reason)
    .bind(&m.approved_by)
    .bind(&m.performed_by)
    .bind(&m.notes)
    .bind(&m.barcode_scanned)
    .bind(m.performed_at)
    .bind(m.is_reversal)
    .bind(m.reverses_id)
    .bind(m.reversed_by_id)
    .bind(m.linked_movement_id)
    .execute(executor)
    .await?;
    Ok(())
}

async fn insert_alert<'e, E: PgExecutor<'e>>(executor: E, alert: &Alert) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO alerts (
            id, alert_type, severity, title, description, product_id, store_id, location_id,
            status, acknowledged_by, acknowledged_at, resolved_by, resolved_at, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(alert.id)
    .bind(alert.alert_type.as_str())
    .bind(alert.severity.as_str())
    .bind(&alert.title)
    .bind(&alert.description)
    .bind(alert.product_id)
    .bind(alert.store_id)
    .bind(alert.location_id)
    .bind(alert.status.as_str())
    .bind(&alert.acknowledged_by)
    .bind(alert.acknowledged_at)
    .bind(&alert.resolved_by)
    .bind(alert.resolved_at)
    .bind(alert.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Location graph
    // ------------------------------------------------------------------

    async fn insert_location(&self, location: &Location) -> AppResult<()> {
        insert_location(&self.db, location).await?;
        Ok(())
    }

    async fn get_location(&self, id: Uuid) -> AppResult<Option<Location>> {
        let sql = format!("SELECT {} FROM locations WHERE id = $1", LOCATION_COLUMNS);
        sqlx::query_as::<_, LocationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Location::try_from)
            .transpose()
    }

    async fn list_locations(&self) -> AppResult<Vec<Location>> {
        let sql = format!("SELECT {} FROM locations ORDER BY created_at", LOCATION_COLUMNS);
        let rows = sqlx::query_as::<_, LocationRow>(&sql)
            .fetch_all(&self.db)
            .await?;
        convert_all(rows)
    }

    async fn set_location_status(&self, id: Uuid, status: Lifecycle) -> AppResult<bool> {
        let result = sqlx::query("UPDATE locations SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(status.is_active())
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Partners
    // ------------------------------------------------------------------

    async fn insert_store(&self, store: &Store, location: &Location) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stores (id, name, contact_name, contact_phone, address, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(store.id)
        .bind(&store.name)
        .bind(&store.contact_name)
        .bind(&store.contact_phone)
        .bind(&store.address)
        .bind(store.is_active())
        .bind(store.created_at)
        .execute(&mut *tx)
        .await?;

        insert_location(&mut *tx, location).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_store(&self, id: Uuid) -> AppResult<Option<Store>> {
        let row = sqlx::query_as::<_, StoreRow>(
            r#"
            SELECT id, name, contact_name, contact_phone, address, is_active, created_at
            FROM stores WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Store::from))
    }

    async fn list_stores(&self) -> AppResult<Vec<Store>> {
        let rows = sqlx::query_as::<_, StoreRow>(
            r#"
            SELECT id, name, contact_name, contact_phone, address, is_active, created_at
            FROM stores ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Store::from).collect())
    }

    async fn set_store_status(&self, id: Uuid, status: Lifecycle) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query("UPDATE stores SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(status.is_active())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE locations SET is_active = $2 WHERE store_id = $1")
            .bind(id)
            .bind(status.is_active())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn insert_vendor(&self, vendor: &Vendor) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vendors (id, name, contact_name, contact_phone, contact_email, notes, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(vendor.id)
        .bind(&vendor.name)
        .bind(&vendor.contact_name)
        .bind(&vendor.contact_phone)
        .bind(&vendor.contact_email)
        .bind(&vendor.notes)
        .bind(vendor.status.is_active())
        .bind(vendor.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_vendor(&self, id: Uuid) -> AppResult<Option<Vendor>> {
        let row = sqlx::query_as::<_, VendorRow>(
            r#"
            SELECT id, name, contact_name, contact_phone, contact_email, notes, is_active, created_at
            FROM vendors WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Vendor::from))
    }

    async fn list_vendors(&self) -> AppResult<Vec<Vendor>> {
        let rows = sqlx::query_as::<_, VendorRow>(
            r#"
            SELECT id, name, contact_name, contact_phone, contact_email, notes, is_active, created_at
            FROM vendors ORDER BY name
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Vendor::from).collect())
    }

    async fn update_vendor(&self, vendor: &Vendor) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE vendors
            SET name = $2, contact_name = $3, contact_phone = $4, contact_email = $5,
                notes = $6, is_active = $7
            WHERE id = $1
            "#,
        )
        .bind(vendor.id)
        .bind(&vendor.name)
        .bind(&vendor.contact_name)
        .bind(&vendor.contact_phone)
        .bind(&vendor.contact_email)
        .bind(&vendor.notes)
        .bind(vendor.status.is_active())
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    async fn insert_product(
        &self,
        product: &Product,
        pricing: Option<&ProductPricing>,
    ) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, variant, sku, packs_per_box, notes, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.variant)
        .bind(&product.sku)
        .bind(product.packs_per_box)
        .bind(&product.notes)
        .bind(product.is_active())
        .bind(product.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "sku"))?;

        if let Some(pricing) = pricing {
            upsert_pricing(&mut *tx, pricing).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, variant, sku, packs_per_box, notes, is_active, created_at
            FROM products WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, variant, sku, packs_per_box, notes, is_active, created_at
            FROM products ORDER BY name, variant
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn set_product_status(&self, id: Uuid, status: Lifecycle) -> AppResult<bool> {
        let result = sqlx::query("UPDATE products SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(status.is_active())
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_pricing(&self, product_id: Uuid) -> AppResult<Option<ProductPricing>> {
        let row = sqlx::query_as::<_, PricingRow>(
            r#"
            SELECT product_id, cost_per_box, retail_price_per_pack, retail_price_per_box,
                   wholesale_price_per_box, updated_at
            FROM product_pricing WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(ProductPricing::from))
    }

    async fn upsert_pricing(&self, pricing: &ProductPricing) -> AppResult<()> {
        upsert_pricing(&self.db, pricing).await?;
        Ok(())
    }

    async fn get_price_override(
        &self,
        store_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<StorePriceOverride>> {
        let row = sqlx::query_as::<_, OverrideRow>(
            r#"
            SELECT store_id, product_id, wholesale_price_per_box, updated_at
            FROM store_price_overrides WHERE store_id = $1 AND product_id = $2
            "#,
        )
        .bind(store_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(StorePriceOverride::from))
    }

    async fn upsert_price_override(&self, price: &StorePriceOverride) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO store_price_overrides (store_id, product_id, wholesale_price_per_box, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (store_id, product_id)
            DO UPDATE SET wholesale_price_per_box = EXCLUDED.wholesale_price_per_box,
                          updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(price.store_id)
        .bind(price.product_id)
        .bind(price.wholesale_price_per_box)
        .bind(price.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn insert_barcode(&self, barcode: &Barcode) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO barcodes (id, value, product_id, unit_type, symbology, label, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(barcode.id)
        .bind(&barcode.value)
        .bind(barcode.product_id)
        .bind(barcode.unit_type.as_str())
        .bind(&barcode.symbology)
        .bind(&barcode.label)
        .bind(barcode.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "barcode"))?;
        Ok(())
    }

    async fn find_barcode(&self, value: &str) -> AppResult<Option<Barcode>> {
        sqlx::query_as::<_, BarcodeRow>(
            r#"
            SELECT id, value, product_id, unit_type, symbology, label, created_at
            FROM barcodes WHERE value = $1
            "#,
        )
        .bind(value)
        .fetch_optional(&self.db)
        .await?
        .map(Barcode::try_from)
        .transpose()
    }

    // ------------------------------------------------------------------
    // Movement ledger
    // ------------------------------------------------------------------

    async fn append_movements(&self, rows: &[Movement]) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        for row in rows {
            insert_movement(&mut *tx, row).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn append_reversal(&self, reversal: &Movement) -> AppResult<()> {
        let original_id = reversal
            .reverses_id
            .ok_or_else(|| AppError::Internal("Reversal row without a target".to_string()))?;

        let mut tx = self.db.begin().await?;

        insert_movement(&mut *tx, reversal).await.map_err(|e| {
            match map_unique_violation(e, "reversal") {
                AppError::DuplicateEntry(_) => AppError::AlreadyReversed(original_id),
                other => other,
            }
        })?;

        let stamped = sqlx::query(
            r#"
            UPDATE movements
            SET reversed_by_id = $1
            WHERE id = $2 AND reversed_by_id IS NULL AND NOT is_reversal
            "#,
        )
        .bind(reversal.id)
        .bind(original_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if stamped == 0 {
            tx.rollback().await?;
            return Err(AppError::AlreadyReversed(original_id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_movement(&self, id: Uuid) -> AppResult<Option<Movement>> {
        let sql = format!("SELECT {} FROM movements WHERE id = $1", MOVEMENT_COLUMNS);
        sqlx::query_as::<_, MovementRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Movement::try_from)
            .transpose()
    }

    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>> {
        let sql = format!(
            "SELECT {} FROM movements WHERE {} ORDER BY seq",
            MOVEMENT_COLUMNS, MOVEMENT_FILTER
        );
        let rows = sqlx::query_as::<_, MovementRow>(&sql)
            .bind(filter.action.map(|a| a.as_str()))
            .bind(filter.product_id)
            .bind(filter.unit_type.map(|u| u.as_str()))
            .bind(filter.location_id)
            .bind(filter.store_id)
            .bind(filter.include_reversals)
            .fetch_all(&self.db)
            .await?;
        convert_all(rows)
    }

    async fn page_movements(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Movement>, u64)> {
        let count_sql = format!("SELECT COUNT(*) FROM movements WHERE {}", MOVEMENT_FILTER);
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(filter.action.map(|a| a.as_str()))
            .bind(filter.product_id)
            .bind(filter.unit_type.map(|u| u.as_str()))
            .bind(filter.location_id)
            .bind(filter.store_id)
            .bind(filter.include_reversals)
            .fetch_one(&self.db)
            .await?;

        let sql = format!(
            "SELECT {} FROM movements WHERE {} ORDER BY seq DESC LIMIT $7 OFFSET $8",
            MOVEMENT_COLUMNS, MOVEMENT_FILTER
        );
        let rows = sqlx::query_as::<_, MovementRow>(&sql)
            .bind(filter.action.map(|a| a.as_str()))
            .bind(filter.product_id)
            .bind(filter.unit_type.map(|u| u.as_str()))
            .bind(filter.location_id)
            .bind(filter.store_id)
            .bind(filter.include_reversals)
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64)
            .fetch_all(&self.db)
            .await?;

        Ok((convert_all(rows)?, total.max(0) as u64))
    }

    // ------------------------------------------------------------------
    // Store counts and payments
    // ------------------------------------------------------------------

    async fn insert_store_counts(&self, counts: &[StoreCount], alerts: &[Alert]) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        for count in counts {
            sqlx::query(
                r#"
                INSERT INTO store_counts (id, store_id, product_id, count_date, boxes_remaining, counted_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(count.id)
            .bind(count.store_id)
            .bind(count.product_id)
            .bind(count.count_date)
            .bind(count.boxes_remaining)
            .bind(&count.counted_by)
            .bind(count.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "store count"))?;
        }

        for alert in alerts {
            insert_alert(&mut *tx, alert).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_store_counts(&self, store_id: Option<Uuid>) -> AppResult<Vec<StoreCount>> {
        let rows = sqlx::query_as::<_, StoreCountRow>(
            r#"
            SELECT id, store_id, product_id, count_date, boxes_remaining, counted_by, created_at
            FROM store_counts
            WHERE ($1::uuid IS NULL OR store_id = $1)
            ORDER BY count_date, created_at
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(StoreCount::from).collect())
    }

    async fn insert_payment(&self, payment: &StorePayment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO store_payments (id, store_id, amount, payment_date, payment_method, notes, collected_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.id)
        .bind(payment.store_id)
        .bind(payment.amount)
        .bind(payment.payment_date)
        .bind(&payment.payment_method)
        .bind(&payment.notes)
        .bind(&payment.collected_by)
        .bind(payment.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_payments(&self, store_id: Uuid) -> AppResult<Vec<StorePayment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, store_id, amount, payment_date, payment_method, notes, collected_by, created_at
            FROM store_payments WHERE store_id = $1
            ORDER BY payment_date, created_at
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(StorePayment::from).collect())
    }

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    async fn insert_alert(&self, alert: &Alert) -> AppResult<()> {
        insert_alert(&self.db, alert).await?;
        Ok(())
    }

    async fn get_alert(&self, id: Uuid) -> AppResult<Option<Alert>> {
        let sql = format!("SELECT {} FROM alerts WHERE id = $1", ALERT_COLUMNS);
        sqlx::query_as::<_, AlertRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Alert::try_from)
            .transpose()
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> AppResult<Vec<Alert>> {
        let sql = format!(
            r#"
            SELECT {} FROM alerts
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR alert_type = $2)
              AND (NOT $3 OR status <> 'RESOLVED')
            ORDER BY created_at DESC
            "#,
            ALERT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AlertRow>(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.alert_type.map(|t| t.as_str()))
            .bind(filter.unresolved_only)
            .fetch_all(&self.db)
            .await?;
        convert_all(rows)
    }

    async fn update_alert_status(&self, alert: &Alert) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE alerts
            SET status = $2, acknowledged_by = $3, acknowledged_at = $4,
                resolved_by = $5, resolved_at = $6
            WHERE id = $1
            "#,
        )
        .bind(alert.id)
        .bind(alert.status.as_str())
        .bind(&alert.acknowledged_by)
        .bind(alert.acknowledged_at)
        .bind(&alert.resolved_by)
        .bind(alert.resolved_at)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn upsert_pricing<'e, E: PgExecutor<'e>>(
    executor: E,
    pricing: &ProductPricing,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO product_pricing (
            product_id, cost_per_box, retail_price_per_pack, retail_price_per_box,
            wholesale_price_per_box, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (product_id)
        DO UPDATE SET cost_per_box = EXCLUDED.cost_per_box,
                      retail_price_per_pack = EXCLUDED.retail_price_per_pack,
                      retail_price_per_box = EXCLUDED.retail_price_per_box,
                      wholesale_price_per_box = EXCLUDED.wholesale_price_per_box,
                      updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(pricing.product_id)
    .bind(pricing.cost_per_box)
    .bind(pricing.retail_price_per_pack)
    .bind(pricing.retail_price_per_box)
    .bind(pricing.wholesale_price_per_box)
    .bind(pricing.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}
