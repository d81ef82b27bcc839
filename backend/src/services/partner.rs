//! Partner stores and vendors

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{
    clean_optional, store_location_name, validate_required_text, Actor, AppRole, Lifecycle,
    Location, LocationKind, Store, Vendor,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::require_role;
use crate::store::LedgerStore;

/// Partner service for stores and vendors
#[derive(Clone)]
pub struct PartnerService {
    store: Arc<dyn LedgerStore>,
}

/// Input for creating a store
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStoreInput {
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
}

/// A store and the location its consignment stock sits at
#[derive(Debug, Clone, Serialize)]
pub struct StoreWithLocation {
    #[serde(flatten)]
    pub store: Store,
    pub location: Location,
}

/// Input for creating or updating a vendor
#[derive(Debug, Clone, Deserialize)]
pub struct VendorInput {
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub notes: Option<String>,
}

fn required_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    validate_required_text(name).map_err(|_| AppError::field("name", "Name is required"))?;
    Ok(name.to_string())
}

impl PartnerService {
    /// Create a new PartnerService instance
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    // ========================================================================
    // Stores
    // ========================================================================

    /// Create a store and its STORE location in one transaction
    pub async fn create_store(
        &self,
        actor: &Actor,
        input: CreateStoreInput,
    ) -> AppResult<StoreWithLocation> {
        require_role(actor, AppRole::Manager, "Creating stores")?;
        let name = required_name(&input.name)?;

        let now = Utc::now();
        let store = Store {
            id: Uuid::new_v4(),
            name,
            contact_name: clean_optional(input.contact_name),
            contact_phone: clean_optional(input.contact_phone),
            address: clean_optional(input.address),
            status: Lifecycle::Active,
            created_at: now,
        };
        let location = Location {
            id: Uuid::new_v4(),
            name: store_location_name(&store.name),
            kind: LocationKind::Store,
            parent_id: None,
            store_id: Some(store.id),
            status: Lifecycle::Active,
            created_at: now,
        };

        self.store.insert_store(&store, &location).await?;

        tracing::info!(
            store_id = %store.id,
            location_id = %location.id,
            name = %store.name,
            "Store created"
        );

        Ok(StoreWithLocation { store, location })
    }

    pub async fn get_store(&self, store_id: Uuid) -> AppResult<Store> {
        self.store
            .get_store(store_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Store".to_string()))
    }

    /// The STORE location linked to a store
    pub async fn store_location(&self, store_id: Uuid) -> AppResult<Location> {
        self.store
            .list_locations()
            .await?
            .into_iter()
            .find(|l| l.kind == LocationKind::Store && l.store_id == Some(store_id))
            .ok_or_else(|| AppError::NotFound("Store location".to_string()))
    }

    /// Stores ordered by name; inactive ones only when asked for
    pub async fn list_stores(&self, include_inactive: bool) -> AppResult<Vec<Store>> {
        let mut stores = self.store.list_stores().await?;
        stores.retain(|s| include_inactive || s.is_active());
        stores.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stores)
    }

    pub async fn deactivate_store(&self, actor: &Actor, store_id: Uuid) -> AppResult<()> {
        self.set_store_status(actor, store_id, Lifecycle::Inactive).await
    }

    pub async fn reactivate_store(&self, actor: &Actor, store_id: Uuid) -> AppResult<()> {
        self.set_store_status(actor, store_id, Lifecycle::Active).await
    }

    async fn set_store_status(
        &self,
        actor: &Actor,
        store_id: Uuid,
        status: Lifecycle,
    ) -> AppResult<()> {
        require_role(actor, AppRole::Manager, "Changing store status")?;

        if !self.store.set_store_status(store_id, status).await? {
            return Err(AppError::NotFound("Store".to_string()));
        }

        tracing::info!(store_id = %store_id, status = ?status, "Store and its location status changed");
        Ok(())
    }

    // ========================================================================
    // Vendors
    // ========================================================================

    pub async fn create_vendor(&self, actor: &Actor, input: VendorInput) -> AppResult<Vendor> {
        require_role(actor, AppRole::Manager, "Creating vendors")?;

        let vendor = Vendor {
            id: Uuid::new_v4(),
            name: required_name(&input.name)?,
            contact_name: clean_optional(input.contact_name),
            contact_phone: clean_optional(input.contact_phone),
            contact_email: clean_optional(input.contact_email),
            notes: clean_optional(input.notes),
            status: Lifecycle::Active,
            created_at: Utc::now(),
        };
        self.store.insert_vendor(&vendor).await?;

        tracing::info!(vendor_id = %vendor.id, name = %vendor.name, "Vendor created");
        Ok(vendor)
    }

    /// Replace a vendor's details; blank optional fields are cleared
    pub async fn update_vendor(
        &self,
        actor: &Actor,
        vendor_id: Uuid,
        input: VendorInput,
    ) -> AppResult<Vendor> {
        require_role(actor, AppRole::Manager, "Updating vendors")?;
        let name = required_name(&input.name)?;

        let mut vendor = self.get_vendor(vendor_id).await?;
        vendor.name = name;
        vendor.contact_name = clean_optional(input.contact_name);
        vendor.contact_phone = clean_optional(input.contact_phone);
        vendor.contact_email = clean_optional(input.contact_email);
        vendor.notes = clean_optional(input.notes);

        if !self.store.update_vendor(&vendor).await? {
            return Err(AppError::NotFound("Vendor".to_string()));
        }

        tracing::info!(vendor_id = %vendor.id, "Vendor updated");
        Ok(vendor)
    }

    pub async fn get_vendor(&self, vendor_id: Uuid) -> AppResult<Vendor> {
        self.store
            .get_vendor(vendor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vendor".to_string()))
    }

    pub async fn list_vendors(&self, include_inactive: bool) -> AppResult<Vec<Vendor>> {
        let mut vendors = self.store.list_vendors().await?;
        vendors.retain(|v| include_inactive || v.status.is_active());
        vendors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(vendors)
    }

    pub async fn deactivate_vendor(&self, actor: &Actor, vendor_id: Uuid) -> AppResult<()> {
        self.set_vendor_status(actor, vendor_id, Lifecycle::Inactive).await
    }

    pub async fn reactivate_vendor(&self, actor: &Actor, vendor_id: Uuid) -> AppResult<()> {
        self.set_vendor_status(actor, vendor_id, Lifecycle::Active).await
    }

    async fn set_vendor_status(
        &self,
        actor: &Actor,
        vendor_id: Uuid,
        status: Lifecycle,
    ) -> AppResult<()> {
        require_role(actor, AppRole::Manager, "Changing vendor status")?;

        let mut vendor = self.get_vendor(vendor_id).await?;
        vendor.status = status;
        self.store.update_vendor(&vendor).await?;

        tracing::info!(vendor_id = %vendor_id, status = ?status, "Vendor status changed");
        Ok(())
    }
}
