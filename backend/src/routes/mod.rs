//! Route definitions for the Consignment Ledger API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{
    handlers,
    middleware::{auth_middleware, cron_middleware},
    AppState,
};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Timer trigger (cron secret)
        .nest("/cron", cron_routes(state.clone()))
        // Protected routes
        .merge(protected_routes(state))
}

/// Routes called by the external timer
fn cron_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/alerts", post(handlers::run_alert_scan))
        .route_layer(middleware::from_fn_with_state(state, cron_middleware))
}

/// Everything that needs a user token
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/movements", movement_routes())
        .nest("/inventory", inventory_routes())
        .nest("/products", product_routes())
        .route("/barcodes/:value", get(handlers::lookup_barcode))
        .nest("/locations", location_routes())
        .nest("/vendors", vendor_routes())
        .nest("/stores", store_routes())
        .route("/reports/shrinkage", get(handlers::get_shrinkage_report))
        .nest("/alerts", alert_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Movement ledger routes
fn movement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_movements).post(handlers::append_movement),
        )
        .route("/convert", post(handlers::convert_box_to_packs))
        .route("/adjust", post(handlers::create_adjustment))
        .route("/:movement_id", get(handlers::get_movement))
        .route("/:movement_id/reverse", post(handlers::reverse_movement))
}

/// On-hand projection routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_inventory))
        .route("/on-hand", get(handlers::get_on_hand))
        .route("/by-kind", get(handlers::get_inventory_by_kind))
        .route("/negative", get(handlers::get_negative_inventory))
}

/// Catalog routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/:product_id", get(handlers::get_product))
        .route(
            "/:product_id/pricing",
            get(handlers::get_pricing_summary).put(handlers::set_product_pricing),
        )
        .route("/:product_id/deactivate", post(handlers::deactivate_product))
        .route("/:product_id/reactivate", post(handlers::reactivate_product))
        .route("/:product_id/barcodes", post(handlers::register_barcode))
}

/// Location graph routes
fn location_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_locations).post(handlers::create_location),
        )
        .route("/:location_id", get(handlers::get_location))
        .route("/:location_id/deactivate", post(handlers::deactivate_location))
        .route("/:location_id/reactivate", post(handlers::reactivate_location))
}

/// Vendor routes
fn vendor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_vendors).post(handlers::create_vendor))
        .route(
            "/:vendor_id",
            get(handlers::get_vendor).put(handlers::update_vendor),
        )
        .route("/:vendor_id/deactivate", post(handlers::deactivate_vendor))
        .route("/:vendor_id/reactivate", post(handlers::reactivate_vendor))
}

/// Store, price override and reconciliation routes
fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stores).post(handlers::create_store))
        .route("/balances", get(handlers::get_balance_overview))
        .route("/:store_id", get(handlers::get_store))
        .route("/:store_id/deactivate", post(handlers::deactivate_store))
        .route("/:store_id/reactivate", post(handlers::reactivate_store))
        .route(
            "/:store_id/prices/:product_id",
            put(handlers::set_store_price),
        )
        .route(
            "/:store_id/counts",
            get(handlers::list_store_counts).post(handlers::submit_store_count),
        )
        .route("/:store_id/count-sheet", get(handlers::get_count_sheet))
        .route(
            "/:store_id/payments",
            get(handlers::list_store_payments).post(handlers::record_payment),
        )
        .route("/:store_id/balance", get(handlers::get_store_balance))
}

/// Alert routes
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_alerts))
        .route("/:alert_id/status", put(handlers::update_alert_status))
}
