//! HTTP handlers for on-hand inventory endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{AppRole, KindTotalRow, UnitType};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::inventory::{InventoryLine, InventoryService};
use crate::AppState;

/// Query parameters for a single on-hand figure
#[derive(Debug, Deserialize)]
pub struct OnHandQuery {
    pub product_id: Uuid,
    pub unit_type: UnitType,
    pub location_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OnHandResponse {
    pub product_id: Uuid,
    pub unit_type: UnitType,
    pub location_id: Uuid,
    pub on_hand: i64,
}

/// Full inventory at active locations
pub async fn get_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryLine>>> {
    require_role(&current_user.0, AppRole::Staff, "Viewing warehouse inventory")?;
    let service = InventoryService::new(state.store);
    let lines = service.inventory_report().await?;
    Ok(Json(lines))
}

/// On-hand of one product and unit at one location
pub async fn get_on_hand(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<OnHandQuery>,
) -> AppResult<Json<OnHandResponse>> {
    require_role(&current_user.0, AppRole::Staff, "Viewing warehouse inventory")?;
    let service = InventoryService::new(state.store);
    let on_hand = service
        .on_hand(query.product_id, query.unit_type, query.location_id)
        .await?;
    Ok(Json(OnHandResponse {
        product_id: query.product_id,
        unit_type: query.unit_type,
        location_id: query.location_id,
        on_hand,
    }))
}

/// Totals per location kind
pub async fn get_inventory_by_kind(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<KindTotalRow>>> {
    require_role(&current_user.0, AppRole::Staff, "Viewing warehouse inventory")?;
    let service = InventoryService::new(state.store);
    Ok(Json(service.inventory_by_kind().await?))
}

/// Every figure below zero
pub async fn get_negative_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryLine>>> {
    require_role(&current_user.0, AppRole::Staff, "Viewing warehouse inventory")?;
    let service = InventoryService::new(state.store);
    Ok(Json(service.negative_inventory().await?))
}
