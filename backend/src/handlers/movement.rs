//! HTTP handlers for the movement ledger

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{
    AppRole, Movement, MovementAction, MovementFilter, PaginatedResponse, Pagination, UnitType,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, require_store_access, scope_store_filter, CurrentUser};
use crate::services::movement::{
    AdjustInput, AppendMovementInput, ConversionResult, ConvertInput, MovementService,
};
use crate::services::reversal::{ReverseInput, ReversalService};
use crate::AppState;

/// Query parameters for the movement history
#[derive(Debug, Deserialize)]
pub struct MovementHistoryQuery {
    pub action: Option<MovementAction>,
    pub product_id: Option<Uuid>,
    pub unit_type: Option<UnitType>,
    pub location_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub include_reversals: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl MovementHistoryQuery {
    fn split(self) -> (MovementFilter, Pagination) {
        let defaults = Pagination::default();
        let pagination = Pagination {
            page: self.page.unwrap_or(defaults.page).max(1),
            per_page: self.per_page.unwrap_or(defaults.per_page).clamp(1, 200),
        };
        let filter = MovementFilter {
            action: self.action,
            product_id: self.product_id,
            unit_type: self.unit_type,
            location_id: self.location_id,
            store_id: self.store_id,
            include_reversals: self.include_reversals.unwrap_or(true),
        };
        (filter, pagination)
    }
}

/// Append one movement
pub async fn append_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AppendMovementInput>,
) -> AppResult<(StatusCode, Json<Movement>)> {
    let service = MovementService::new(state.store);
    let movement = service.append_movement(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Correct stock at one location
pub async fn create_adjustment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AdjustInput>,
) -> AppResult<(StatusCode, Json<Movement>)> {
    let service = MovementService::new(state.store);
    let movement = service.adjust(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Open boxes into packs
pub async fn convert_box_to_packs(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ConvertInput>,
) -> AppResult<(StatusCode, Json<ConversionResult>)> {
    let service = MovementService::new(state.store);
    let result = service.convert_box_to_packs(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Movement history, newest first. A Viewer only sees its own store's rows.
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<MovementHistoryQuery>,
) -> AppResult<Json<PaginatedResponse<Movement>>> {
    let (mut filter, pagination) = query.split();
    filter.store_id = scope_store_filter(&current_user.0, filter.store_id)?;
    let service = MovementService::new(state.store);
    let page = service.list_movements(&filter, &pagination).await?;
    Ok(Json(page))
}

/// Get a movement by ID
pub async fn get_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<Movement>> {
    let service = MovementService::new(state.store);
    let movement = service.get_movement(movement_id).await?;
    match movement.store_id {
        Some(store_id) => require_store_access(&current_user.0, store_id)?,
        None => require_role(&current_user.0, AppRole::Staff, "Viewing warehouse movements")?,
    }
    Ok(Json(movement))
}

/// Reverse a movement
pub async fn reverse_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(movement_id): Path<Uuid>,
    Json(input): Json<ReverseInput>,
) -> AppResult<(StatusCode, Json<Movement>)> {
    let service = ReversalService::new(state.store);
    let reversal = service
        .reverse_movement(&current_user.0, movement_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(reversal)))
}
