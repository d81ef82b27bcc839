//! HTTP handlers for partner stores and vendors

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Store, StorePriceOverride, Vendor};
use uuid::Uuid;

use super::catalog::IncludeInactiveQuery;
use crate::error::AppResult;
use crate::middleware::{require_store_access, CurrentUser};
use crate::services::partner::{CreateStoreInput, PartnerService, StoreWithLocation, VendorInput};
use crate::services::pricing::{PricingService, StorePriceInput};
use crate::AppState;

// ============================================================================
// Stores
// ============================================================================

/// Create a store and its store location
pub async fn create_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStoreInput>,
) -> AppResult<(StatusCode, Json<StoreWithLocation>)> {
    let service = PartnerService::new(state.store);
    let store = service.create_store(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// Stores the caller may see
pub async fn list_stores(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<IncludeInactiveQuery>,
) -> AppResult<Json<Vec<Store>>> {
    let service = PartnerService::new(state.store);
    let mut stores = service
        .list_stores(query.include_inactive.unwrap_or(false))
        .await?;
    stores.retain(|s| current_user.0.can_view_store(s.id));
    Ok(Json(stores))
}

/// Get a store with its location
pub async fn get_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<StoreWithLocation>> {
    require_store_access(&current_user.0, store_id)?;
    let service = PartnerService::new(state.store);
    let store = service.get_store(store_id).await?;
    let location = service.store_location(store_id).await?;
    Ok(Json(StoreWithLocation { store, location }))
}

pub async fn deactivate_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PartnerService::new(state.store);
    service.deactivate_store(&current_user.0, store_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reactivate_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PartnerService::new(state.store);
    service.reactivate_store(&current_user.0, store_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set the wholesale price a store pays for a product
pub async fn set_store_price(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<StorePriceInput>,
) -> AppResult<Json<StorePriceOverride>> {
    let service = PricingService::new(state.store);
    let price = service
        .set_store_price(&current_user.0, store_id, product_id, input)
        .await?;
    Ok(Json(price))
}

// ============================================================================
// Vendors
// ============================================================================

pub async fn create_vendor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<VendorInput>,
) -> AppResult<(StatusCode, Json<Vendor>)> {
    let service = PartnerService::new(state.store);
    let vendor = service.create_vendor(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

pub async fn list_vendors(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<IncludeInactiveQuery>,
) -> AppResult<Json<Vec<Vendor>>> {
    let service = PartnerService::new(state.store);
    let vendors = service
        .list_vendors(query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(vendors))
}

pub async fn get_vendor(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(vendor_id): Path<Uuid>,
) -> AppResult<Json<Vendor>> {
    let service = PartnerService::new(state.store);
    Ok(Json(service.get_vendor(vendor_id).await?))
}

pub async fn update_vendor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vendor_id): Path<Uuid>,
    Json(input): Json<VendorInput>,
) -> AppResult<Json<Vendor>> {
    let service = PartnerService::new(state.store);
    let vendor = service
        .update_vendor(&current_user.0, vendor_id, input)
        .await?;
    Ok(Json(vendor))
}

pub async fn deactivate_vendor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vendor_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PartnerService::new(state.store);
    service.deactivate_vendor(&current_user.0, vendor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reactivate_vendor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(vendor_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PartnerService::new(state.store);
    service.reactivate_vendor(&current_user.0, vendor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
