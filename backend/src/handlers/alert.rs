//! HTTP handlers for alerts and the scheduled scan

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{Alert, AlertFilter, AppRole};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::alert::{AlertScanSummary, AlertService, UpdateAlertStatusInput};
use crate::AppState;

/// Response to the external timer
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub ok: bool,
    pub alerts_created: AlertScanSummary,
    pub timestamp: DateTime<Utc>,
}

/// List alerts, newest first
pub async fn list_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<AlertFilter>,
) -> AppResult<Json<Vec<Alert>>> {
    require_role(&current_user.0, AppRole::Staff, "Viewing alerts")?;
    let service = AlertService::new(state.store, state.config.alerts);
    Ok(Json(service.list_alerts(&filter).await?))
}

/// Acknowledge or resolve an alert
pub async fn update_alert_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
    Json(input): Json<UpdateAlertStatusInput>,
) -> AppResult<Json<Alert>> {
    let service = AlertService::new(state.store, state.config.alerts);
    let alert = service
        .update_status(&current_user.0, alert_id, input)
        .await?;
    Ok(Json(alert))
}

/// Run the alert scan; guarded by the cron secret instead of a user token
pub async fn run_alert_scan(State(state): State<AppState>) -> AppResult<Json<ScanResponse>> {
    let service = AlertService::new(state.store, state.config.alerts);
    let summary = service.run_scan().await?;
    Ok(Json(ScanResponse {
        ok: true,
        alerts_created: summary,
        timestamp: Utc::now(),
    }))
}
