//! HTTP handlers for the location graph

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Location, LocationKind};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::location::{CreateLocationInput, LocationService};
use crate::AppState;

/// Query parameters for listing locations
#[derive(Debug, Deserialize)]
pub struct ListLocationsQuery {
    pub kind: Option<LocationKind>,
}

/// Create a storage room, shelf or truck
pub async fn create_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateLocationInput>,
) -> AppResult<(StatusCode, Json<Location>)> {
    let service = LocationService::new(state.store);
    let location = service.create_location(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// Active locations, optionally of one kind
pub async fn list_locations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListLocationsQuery>,
) -> AppResult<Json<Vec<Location>>> {
    let service = LocationService::new(state.store);
    let kinds = query.kind.map(|k| [k]);
    let locations = service.list_locations(kinds.as_ref().map(|k| &k[..])).await?;
    Ok(Json(locations))
}

pub async fn get_location(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(location_id): Path<Uuid>,
) -> AppResult<Json<Location>> {
    let service = LocationService::new(state.store);
    Ok(Json(service.get_location(location_id).await?))
}

pub async fn deactivate_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(location_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = LocationService::new(state.store);
    service.deactivate_location(&current_user.0, location_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reactivate_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(location_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = LocationService::new(state.store);
    service.reactivate_location(&current_user.0, location_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
