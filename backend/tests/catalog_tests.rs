//! Catalog, location graph and partner tests

mod common;

use common::*;
use consignment_ledger::services::catalog::{CreateProductInput, RegisterBarcodeInput};
use consignment_ledger::services::location::CreateLocationInput;
use consignment_ledger::services::partner::VendorInput;
use consignment_ledger::services::{
    CatalogService, LocationService, PartnerService, PricingService,
};
use consignment_ledger::AppError;
use shared::{LocationKind, MovementAction, UnitType, DEFAULT_SYMBOLOGY};

fn product_input(sku: &str, packs_per_box: i32) -> CreateProductInput {
    CreateProductInput {
        name: "Decaf".to_string(),
        variant: None,
        sku: sku.to_string(),
        packs_per_box,
        notes: None,
        pricing: None,
    }
}

#[tokio::test]
async fn test_duplicate_sku_is_rejected() {
    let w = Warehouse::new().await;
    let err = CatalogService::new(w.store.clone())
        .create_product(&manager(), product_input("HB-MED", 6))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateEntry(ref what) if what == "sku"));
}

#[tokio::test]
async fn test_product_rules() {
    let w = Warehouse::new().await;
    let catalog = CatalogService::new(w.store.clone());

    let err = catalog
        .create_product(&manager(), product_input("DECAF-1", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "packs_per_box"));

    let err = catalog
        .create_product(&manager(), product_input("   ", 6))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "sku"));

    // Any non-blank SKU is accepted as typed, minus surrounding spaces
    let created = catalog
        .create_product(&manager(), product_input(" decaf 250g ", 6))
        .await
        .unwrap();
    assert_eq!(created.product.sku, "decaf 250g");

    let err = catalog
        .create_product(&staff(), product_input("DECAF-1", 6))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientPermissions(_)));
}

#[tokio::test]
async fn test_inactive_products_are_hidden_by_default() {
    let w = Warehouse::new().await;
    let catalog = CatalogService::new(w.store.clone());
    catalog.deactivate_product(&manager(), w.product_id).await.unwrap();

    assert!(catalog.list_products(false).await.unwrap().is_empty());
    assert_eq!(catalog.list_products(true).await.unwrap().len(), 1);

    catalog.reactivate_product(&manager(), w.product_id).await.unwrap();
    assert_eq!(catalog.list_products(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_barcode_lookup_resolves_product_and_actions() {
    let w = Warehouse::new().await;
    let catalog = CatalogService::new(w.store.clone());

    let barcode = catalog
        .register_barcode(
            &manager(),
            w.product_id,
            RegisterBarcodeInput {
                value: " 012345678905 ".to_string(),
                unit_type: UnitType::Pack,
                symbology: None,
                label: Some("Single pack".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(barcode.value, "012345678905");
    assert_eq!(barcode.symbology, DEFAULT_SYMBOLOGY);

    let lookup = catalog.lookup_barcode("012345678905").await.unwrap();
    assert_eq!(lookup.product.id, w.product_id);
    assert_eq!(lookup.barcode.unit_type, UnitType::Pack);
    assert!(lookup.actions.contains(&MovementAction::SaleRetailPack));
    assert!(!lookup.actions.contains(&MovementAction::DeliverToStore));

    let err = catalog
        .register_barcode(
            &manager(),
            w.product_id,
            RegisterBarcodeInput {
                value: "012345678905".to_string(),
                unit_type: UnitType::Box,
                symbology: None,
                label: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateEntry(ref what) if what == "barcode"));

    let err = catalog.lookup_barcode("999").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_pricing_summary_derives_pack_figures() {
    let w = Warehouse::new().await;
    let summary = PricingService::new(w.store.clone())
        .pricing_summary(w.product_id)
        .await
        .unwrap();

    // 20.00 per box over 12 packs
    assert_eq!(summary.cost_per_pack.round_dp(4), dec("1.6667"));
}

#[tokio::test]
async fn test_store_override_beats_default_price() {
    let w = Warehouse::new().await;
    let pricing = PricingService::new(w.store.clone());
    assert_eq!(
        pricing.wholesale_price(w.product_id, w.store_id).await.unwrap(),
        dec("30.00")
    );

    pricing
        .set_store_price(
            &manager(),
            w.store_id,
            w.product_id,
            consignment_ledger::services::pricing::StorePriceInput {
                wholesale_price_per_box: dec("27.50"),
            },
        )
        .await
        .unwrap();
    assert_eq!(
        pricing.wholesale_price(w.product_id, w.store_id).await.unwrap(),
        dec("27.50")
    );
}

#[tokio::test]
async fn test_unpriced_product_cannot_be_delivered() {
    let w = Warehouse::new().await;
    let product = CatalogService::new(w.store.clone())
        .create_product(&manager(), product_input("DECAF-1", 6))
        .await
        .unwrap();

    let err = PricingService::new(w.store.clone())
        .wholesale_price(product.product.id, w.store_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PricingMissing(id) if id == product.product.id));
}

#[tokio::test]
async fn test_shelf_needs_storage_parent() {
    let w = Warehouse::new().await;
    let locations = LocationService::new(w.store.clone());

    let err = locations
        .create_location(
            &manager(),
            CreateLocationInput {
                name: "Loose shelf".to_string(),
                kind: LocationKind::Shelf,
                parent_id: Some(w.truck.id),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "parent_id"));

    let err = locations
        .create_location(
            &manager(),
            CreateLocationInput {
                name: "Sneaky store".to_string(),
                kind: LocationKind::Store,
                parent_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn test_store_location_toggles_with_its_store() {
    let w = Warehouse::new().await;
    let partners = PartnerService::new(w.store.clone());
    let locations = LocationService::new(w.store.clone());

    let err = locations
        .deactivate_location(&manager(), w.store_location.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    partners.deactivate_store(&manager(), w.store_id).await.unwrap();
    let location = locations.get_location(w.store_location.id).await.unwrap();
    assert!(!location.is_active());
    assert!(partners.list_stores(false).await.unwrap().is_empty());

    partners.reactivate_store(&manager(), w.store_id).await.unwrap();
    let location = locations.get_location(w.store_location.id).await.unwrap();
    assert!(location.is_active());
    assert_eq!(location.name, "Store: Corner Market");
}

#[tokio::test]
async fn test_locations_list_by_kind() {
    let w = Warehouse::new().await;
    let listed = LocationService::new(w.store.clone())
        .list_locations(Some(&[LocationKind::Storage, LocationKind::Shelf]))
        .await
        .unwrap();

    let kinds: Vec<LocationKind> = listed.iter().map(|l| l.kind).collect();
    assert_eq!(kinds, vec![LocationKind::Storage, LocationKind::Shelf]);
}

#[tokio::test]
async fn test_vendor_update_clears_blank_fields() {
    let w = Warehouse::new().await;
    let partners = PartnerService::new(w.store.clone());

    let vendor = partners
        .update_vendor(
            &manager(),
            w.vendor_id,
            VendorInput {
                name: "  Roastery Supply Co ".to_string(),
                contact_name: Some("   ".to_string()),
                contact_phone: Some("555-0100".to_string()),
                contact_email: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(vendor.name, "Roastery Supply Co");
    assert_eq!(vendor.contact_name, None);
    assert_eq!(vendor.contact_phone.as_deref(), Some("555-0100"));

    let err = partners
        .update_vendor(
            &manager(),
            w.vendor_id,
            VendorInput {
                name: " ".to_string(),
                contact_name: None,
                contact_phone: None,
                contact_email: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "name"));
}
