//! Location graph service

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use shared::{
    validate_location_links, Actor, AppRole, Lifecycle, Location, LocationKind,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::require_role;
use crate::store::LedgerStore;

/// Location service
#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn LedgerStore>,
}

/// Input for creating a storage room, shelf or truck
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLocationInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub kind: LocationKind,
    pub parent_id: Option<Uuid>,
}

impl LocationService {
    /// Create a new LocationService instance
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Create a location. Store locations only come from creating a store.
    pub async fn create_location(
        &self,
        actor: &Actor,
        mut input: CreateLocationInput,
    ) -> AppResult<Location> {
        require_role(actor, AppRole::Manager, "Creating locations")?;

        input.name = input.name.trim().to_string();
        input.validate()?;

        if input.kind == LocationKind::Store {
            return Err(AppError::field(
                "kind",
                "STORE locations are created together with their store",
            ));
        }

        let parent_kind = match input.parent_id {
            Some(parent_id) => {
                let parent = self
                    .store
                    .get_location(parent_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Parent location".to_string()))?;
                Some(parent.kind)
            }
            None => None,
        };

        validate_location_links(input.kind, parent_kind, None)
            .map_err(|msg| AppError::field("parent_id", msg))?;

        let location = Location {
            id: Uuid::new_v4(),
            name: input.name,
            kind: input.kind,
            parent_id: input.parent_id,
            store_id: None,
            status: Lifecycle::Active,
            created_at: Utc::now(),
        };
        self.store.insert_location(&location).await?;

        tracing::info!(
            location_id = %location.id,
            kind = %location.kind,
            name = %location.name,
            "Location created"
        );

        Ok(location)
    }

    pub async fn get_location(&self, location_id: Uuid) -> AppResult<Location> {
        self.store
            .get_location(location_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Location".to_string()))
    }

    /// Active locations, optionally limited to some kinds, ordered by kind then name
    pub async fn list_locations(&self, kinds: Option<&[LocationKind]>) -> AppResult<Vec<Location>> {
        let mut locations = self.store.list_locations().await?;
        locations.retain(|l| l.is_active() && kinds.map_or(true, |k| k.contains(&l.kind)));
        locations.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
        Ok(locations)
    }

    pub async fn deactivate_location(&self, actor: &Actor, location_id: Uuid) -> AppResult<()> {
        self.set_status(actor, location_id, Lifecycle::Inactive).await
    }

    pub async fn reactivate_location(&self, actor: &Actor, location_id: Uuid) -> AppResult<()> {
        self.set_status(actor, location_id, Lifecycle::Active).await
    }

    async fn set_status(&self, actor: &Actor, location_id: Uuid, status: Lifecycle) -> AppResult<()> {
        require_role(actor, AppRole::Manager, "Changing location status")?;

        let location = self.get_location(location_id).await?;
        if location.kind == LocationKind::Store {
            return Err(AppError::field(
                "location_id",
                "STORE locations follow their store; change the store's status instead",
            ));
        }

        self.store.set_location_status(location_id, status).await?;

        tracing::info!(location_id = %location_id, status = ?status, "Location status changed");
        Ok(())
    }
}
