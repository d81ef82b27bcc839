//! Location graph models
//!
//! Four fixed location kinds. Shelves hang off storage rooms; store locations
//! are owned by a partner store and created together with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::{Lifecycle, UnknownVariant};

/// Kind of a physical location
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationKind {
    Storage,
    Shelf,
    Truck,
    Store,
}

impl LocationKind {
    pub const ALL: [LocationKind; 4] = [
        LocationKind::Storage,
        LocationKind::Shelf,
        LocationKind::Truck,
        LocationKind::Store,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Storage => "STORAGE",
            LocationKind::Shelf => "SHELF",
            LocationKind::Truck => "TRUCK",
            LocationKind::Store => "STORE",
        }
    }
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STORAGE" => Ok(LocationKind::Storage),
            "SHELF" => Ok(LocationKind::Shelf),
            "TRUCK" => Ok(LocationKind::Truck),
            "STORE" => Ok(LocationKind::Store),
            other => Err(UnknownVariant::new("location kind", other)),
        }
    }
}

/// A place inventory can sit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub kind: LocationKind,
    /// Containing storage room (shelves only)
    pub parent_id: Option<Uuid>,
    /// Owning partner store (store locations only)
    pub store_id: Option<Uuid>,
    pub status: Lifecycle,
    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Check the structural invariants of a location.
///
/// `parent_kind` is the kind of the referenced parent, when there is one.
pub fn validate_location_links(
    kind: LocationKind,
    parent_kind: Option<LocationKind>,
    store_id: Option<Uuid>,
) -> Result<(), String> {
    match (kind, parent_kind) {
        (LocationKind::Shelf, Some(LocationKind::Storage)) | (_, None) => {}
        (LocationKind::Shelf, Some(other)) => {
            return Err(format!("A shelf's parent must be a STORAGE location, got {}", other));
        }
        (other, Some(_)) => {
            return Err(format!("Only SHELF locations may have a parent, got {}", other));
        }
    }

    match (kind, store_id) {
        (LocationKind::Store, None) => Err("A STORE location must reference its store".to_string()),
        (LocationKind::Store, Some(_)) | (_, None) => Ok(()),
        (other, Some(_)) => Err(format!(
            "Only STORE locations may reference a store, got {}",
            other
        )),
    }
}

/// Name given to the location auto-created for a partner store
pub fn store_location_name(store_name: &str) -> String {
    format!("Store: {}", store_name)
}
