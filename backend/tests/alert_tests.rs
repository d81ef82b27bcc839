//! Alert engine tests
//!
//! Scan coverage per alert type, deduplication against open alerts, and the
//! status lifecycle.

mod common;

use common::*;
use consignment_ledger::config::{AlertSettings, PricingBasis};
use consignment_ledger::services::alert::UpdateAlertStatusInput;
use consignment_ledger::services::movement::AppendMovementInput;
use consignment_ledger::services::reconciliation::RecordPaymentInput;
use consignment_ledger::services::{AlertService, LocationService, ReconciliationService};
use consignment_ledger::AppError;
use shared::{AlertFilter, AlertStatus, AlertType, MovementAction, UnitType};

fn alerts(w: &Warehouse) -> AlertService {
    AlertService::new(w.store.clone(), AlertSettings::default())
}

/// Drive storage below zero the way a lost check-then-append race would
async fn make_negative(w: &Warehouse) {
    w.receive(2).await;
    let mut input =
        AppendMovementInput::new(MovementAction::Adjustment, w.product_id, UnitType::Box, 2)
            .from_location(w.storage.id);
    input.adjustment_reason = Some("Water damage".to_string());
    w.movements().append_movement(&manager(), input).await.unwrap();

    // The racing writer's row skips the sufficiency check
    let mut row = w.receive(1).await;
    row.id = uuid::Uuid::new_v4();
    row.action = MovementAction::Adjustment;
    row.from_location_id = Some(w.storage.id);
    row.to_location_id = None;
    row.quantity = 3;
    row.vendor_id = None;
    row.cost_snapshot = None;
    row.adjustment_reason = Some("Race".to_string());
    w.store.append_movements(&[row]).await.unwrap();
}

#[tokio::test]
async fn test_scan_raises_negative_inventory_once() {
    let w = Warehouse::new().await;
    make_negative(&w).await;
    assert_eq!(w.on_hand(UnitType::Box, w.storage.id).await, -2);

    let first = alerts(&w).run_scan_at(at(2024, 1, 1)).await.unwrap();
    assert_eq!(first.negative_inventory, 1);

    let second = alerts(&w).run_scan_at(at(2024, 1, 1)).await.unwrap();
    assert_eq!(second.total(), 0);

    let open = alerts(&w)
        .list_alerts(&AlertFilter {
            alert_type: Some(AlertType::NegativeInventory),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].location_id, Some(w.storage.id));
    assert_eq!(open[0].title, "Negative inventory: House Blend (Medium) at Back room");
}

#[tokio::test]
async fn test_scan_raises_low_stock_at_storage() {
    let w = Warehouse::new().await;
    w.receive(4).await;

    let summary = alerts(&w).run_scan_at(at(2024, 1, 1)).await.unwrap();
    assert_eq!(summary.low_stock, 1);
    assert_eq!(summary.negative_inventory, 0);

    // Plenty of stock after a restock, and the open alert still blocks a repeat
    w.receive(20).await;
    let summary = alerts(&w).run_scan_at(at(2024, 1, 1)).await.unwrap();
    assert_eq!(summary.low_stock, 0);
}

#[tokio::test]
async fn test_low_stock_ignores_location_status() {
    let w = Warehouse::new().await;
    w.receive(3).await;
    LocationService::new(w.store.clone())
        .deactivate_location(&manager(), w.storage.id)
        .await
        .unwrap();

    let summary = alerts(&w).run_scan_at(at(2024, 1, 1)).await.unwrap();
    assert_eq!(summary.low_stock, 1);
}

#[tokio::test]
async fn test_threshold_is_inclusive() {
    let w = Warehouse::new().await;
    w.receive(5).await;
    let summary = alerts(&w).run_scan_at(at(2024, 1, 1)).await.unwrap();
    assert_eq!(summary.low_stock, 1);

    let w = Warehouse::new().await;
    w.receive(6).await;
    let summary = alerts(&w).run_scan_at(at(2024, 1, 1)).await.unwrap();
    assert_eq!(summary.low_stock, 0);
}

#[tokio::test]
async fn test_payment_overdue_only_for_stores_with_deliveries() {
    let w = Warehouse::new().await;
    w.receive(30).await;

    let summary = alerts(&w).run_scan_at(at(2024, 3, 1)).await.unwrap();
    assert_eq!(summary.payment_overdue, 0);

    w.deliver(10, at(2024, 1, 1)).await;
    let summary = alerts(&w).run_scan_at(at(2024, 3, 1)).await.unwrap();
    assert_eq!(summary.payment_overdue, 1);

    let raised = alerts(&w)
        .list_alerts(&AlertFilter {
            alert_type: Some(AlertType::PaymentOverdue),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(raised[0].description, "No payments on record for this store.");
}

#[tokio::test]
async fn test_recent_payment_clears_overdue() {
    let w = Warehouse::new().await;
    w.receive(30).await;
    w.deliver(10, at(2024, 1, 1)).await;

    ReconciliationService::new(w.store.clone(), PricingBasis::Current)
        .record_payment(
            &staff(),
            w.store_id,
            RecordPaymentInput {
                amount: dec("100.00"),
                payment_date: date(2024, 2, 25),
                payment_method: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    let summary = alerts(&w).run_scan_at(at(2024, 3, 1)).await.unwrap();
    assert_eq!(summary.payment_overdue, 0);

    let summary = alerts(&w).run_scan_at(at(2024, 3, 20)).await.unwrap();
    assert_eq!(summary.payment_overdue, 1);
}

#[tokio::test]
async fn test_resolved_alert_allows_a_fresh_one() {
    let w = Warehouse::new().await;
    w.receive(3).await;
    let service = alerts(&w);

    service.run_scan_at(at(2024, 1, 1)).await.unwrap();
    let raised = service.list_alerts(&AlertFilter::default()).await.unwrap();
    let alert_id = raised[0].id;

    let acknowledged = service
        .update_status(
            &manager(),
            alert_id,
            UpdateAlertStatusInput {
                status: AlertStatus::Acknowledged,
            },
        )
        .await
        .unwrap();
    assert_eq!(acknowledged.acknowledged_by.as_deref(), Some("user_manager"));

    // Acknowledged still counts as open
    assert_eq!(service.run_scan_at(at(2024, 1, 1)).await.unwrap().total(), 0);

    let resolved = service
        .update_status(
            &manager(),
            alert_id,
            UpdateAlertStatusInput {
                status: AlertStatus::Resolved,
            },
        )
        .await
        .unwrap();
    assert!(resolved.resolved_at.is_some());

    assert_eq!(service.run_scan_at(at(2024, 1, 1)).await.unwrap().low_stock, 1);
}

#[tokio::test]
async fn test_resolved_alert_cannot_move_again() {
    let w = Warehouse::new().await;
    w.receive(3).await;
    let service = alerts(&w);
    service.run_scan_at(at(2024, 1, 1)).await.unwrap();
    let alert_id = service.list_alerts(&AlertFilter::default()).await.unwrap()[0].id;

    service
        .update_status(
            &manager(),
            alert_id,
            UpdateAlertStatusInput {
                status: AlertStatus::Resolved,
            },
        )
        .await
        .unwrap();

    let err = service
        .update_status(
            &manager(),
            alert_id,
            UpdateAlertStatusInput {
                status: AlertStatus::Acknowledged,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));

    let err = service
        .update_status(
            &staff(),
            alert_id,
            UpdateAlertStatusInput {
                status: AlertStatus::Resolved,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientPermissions(_)));
}
