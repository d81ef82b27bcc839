//! HTTP handlers for products, pricing and barcodes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Barcode, PricingSummary, Product, ProductPricing};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::catalog::{
    BarcodeLookup, CatalogService, CreateProductInput, ProductDetail, RegisterBarcodeInput,
};
use crate::services::pricing::{PricingInput, PricingService};
use crate::AppState;

/// Query parameters for listings that hide inactive rows by default
#[derive(Debug, Deserialize)]
pub struct IncludeInactiveQuery {
    pub include_inactive: Option<bool>,
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<ProductDetail>)> {
    let service = CatalogService::new(state.store);
    let product = service.create_product(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<IncludeInactiveQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.store);
    let products = service
        .list_products(query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(products))
}

/// Get a product with its pricing
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductDetail>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.get_product(product_id).await?))
}

/// Replace a product's default pricing
pub async fn set_product_pricing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<PricingInput>,
) -> AppResult<Json<ProductPricing>> {
    let service = PricingService::new(state.store);
    let pricing = service
        .set_product_pricing(&current_user.0, product_id, input)
        .await?;
    Ok(Json(pricing))
}

/// Cost per pack and margins
pub async fn get_pricing_summary(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<PricingSummary>> {
    let service = PricingService::new(state.store);
    Ok(Json(service.pricing_summary(product_id).await?))
}

pub async fn deactivate_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CatalogService::new(state.store);
    service.deactivate_product(&current_user.0, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reactivate_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CatalogService::new(state.store);
    service.reactivate_product(&current_user.0, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Register a barcode for a product
pub async fn register_barcode(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<RegisterBarcodeInput>,
) -> AppResult<(StatusCode, Json<Barcode>)> {
    let service = CatalogService::new(state.store);
    let barcode = service
        .register_barcode(&current_user.0, product_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(barcode)))
}

/// Resolve a scanned barcode
pub async fn lookup_barcode(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(value): Path<String>,
) -> AppResult<Json<BarcodeLookup>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.lookup_barcode(&value).await?))
}
