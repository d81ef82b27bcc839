//! HTTP handlers for store counts, payments and balances

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use shared::{AppRole, StoreBalance, StoreCount, StorePayment};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, require_store_access, CurrentUser};
use crate::services::reconciliation::{
    BalanceOverview, CountEntryResult, CountSheet, RecordPaymentInput, ReconciliationService,
    ShrinkageReport, SubmitCountInput,
};
use crate::AppState;

fn service(state: AppState) -> ReconciliationService {
    let basis = state.config.reconciliation.pricing_basis;
    ReconciliationService::new(state.store, basis)
}

/// Submit a physical count for a store
pub async fn submit_store_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    Json(input): Json<SubmitCountInput>,
) -> AppResult<(StatusCode, Json<Vec<CountEntryResult>>)> {
    let results = service(state)
        .submit_store_count(&current_user.0, store_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(results)))
}

/// What to count at a store
pub async fn get_count_sheet(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<CountSheet>> {
    require_store_access(&current_user.0, store_id)?;
    Ok(Json(service(state).count_sheet(store_id).await?))
}

/// Counts recorded at a store, newest first
pub async fn list_store_counts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Vec<StoreCount>>> {
    require_store_access(&current_user.0, store_id)?;
    Ok(Json(service(state).list_store_counts(store_id).await?))
}

/// Payments collected from a store, newest first
pub async fn list_store_payments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Vec<StorePayment>>> {
    require_store_access(&current_user.0, store_id)?;
    Ok(Json(service(state).list_payments(store_id).await?))
}

/// Record a payment collected from a store
pub async fn record_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    Json(input): Json<RecordPaymentInput>,
) -> AppResult<(StatusCode, Json<StorePayment>)> {
    let payment = service(state)
        .record_payment(&current_user.0, store_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Owed, paid and outstanding for a store
pub async fn get_store_balance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<StoreBalance>> {
    require_store_access(&current_user.0, store_id)?;
    Ok(Json(service(state).get_store_balance(store_id).await?))
}

/// Balances of every active store
pub async fn get_balance_overview(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<BalanceOverview>> {
    require_role(&current_user.0, AppRole::Staff, "Viewing all store balances")?;
    let overdue_days = state.config.alerts.payment_overdue_days;
    let today = Utc::now().date_naive();
    Ok(Json(service(state).balance_overview(today, overdue_days).await?))
}

/// Negative inventory and count discrepancies
pub async fn get_shrinkage_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ShrinkageReport>> {
    require_role(&current_user.0, AppRole::Staff, "Viewing the shrinkage report")?;
    Ok(Json(service(state).shrinkage_report().await?))
}
