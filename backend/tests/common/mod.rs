//! Shared fixtures for integration tests
//!
//! Builds a small warehouse over the in-memory store: one storage room with a
//! shelf, a truck, a vendor, one partner store and one priced product.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use consignment_ledger::config::{
    AlertSettings, Config, CronConfig, DatabaseConfig, JwtConfig, LoggingConfig, PricingBasis,
    ReconciliationConfig, ServerConfig, StoreBackend,
};
use consignment_ledger::services::catalog::CreateProductInput;
use consignment_ledger::services::location::CreateLocationInput;
use consignment_ledger::services::movement::AppendMovementInput;
use consignment_ledger::services::partner::{CreateStoreInput, VendorInput};
use consignment_ledger::services::pricing::PricingInput;
use consignment_ledger::services::{
    CatalogService, LocationService, MovementService, PartnerService,
};
use consignment_ledger::store::MemoryStore;
use consignment_ledger::LedgerStore;
use rust_decimal::Decimal;
use shared::{Actor, AppRole, Location, LocationKind, Movement, MovementAction, UnitType};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const CRON_SECRET: &str = "test-cron-secret";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn manager() -> Actor {
    Actor::new("user_manager", "Mina", AppRole::Manager)
}

pub fn staff() -> Actor {
    Actor::new("user_staff", "Sam", AppRole::Staff)
}

pub fn viewer() -> Actor {
    Actor::new("user_viewer", "Vic", AppRole::Viewer)
}

/// A store partner pinned to one store
pub fn partner(store_id: Uuid) -> Actor {
    Actor::new("user_partner", "Pat", AppRole::Viewer).with_store(store_id)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Noon UTC on the given day
pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub fn test_config(pricing_basis: PricingBasis) -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            backend: StoreBackend::Memory,
            url: String::new(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        cron: CronConfig {
            secret: CRON_SECRET.to_string(),
        },
        alerts: AlertSettings::default(),
        reconciliation: ReconciliationConfig { pricing_basis },
        logging: LoggingConfig { json: false },
    }
}

/// A seeded warehouse
pub struct Warehouse {
    pub memory: Arc<MemoryStore>,
    pub store: Arc<dyn LedgerStore>,
    pub storage: Location,
    pub shelf: Location,
    pub truck: Location,
    pub vendor_id: Uuid,
    pub store_id: Uuid,
    pub store_location: Location,
    /// 12 packs per box, wholesale 30.00 per box
    pub product_id: Uuid,
}

impl Warehouse {
    pub async fn new() -> Self {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn LedgerStore> = memory.clone();
        let manager = manager();

        let locations = LocationService::new(store.clone());
        let storage = locations
            .create_location(
                &manager,
                CreateLocationInput {
                    name: "Back room".to_string(),
                    kind: LocationKind::Storage,
                    parent_id: None,
                },
            )
            .await
            .unwrap();
        let shelf = locations
            .create_location(
                &manager,
                CreateLocationInput {
                    name: "Front shelf".to_string(),
                    kind: LocationKind::Shelf,
                    parent_id: Some(storage.id),
                },
            )
            .await
            .unwrap();
        let truck = locations
            .create_location(
                &manager,
                CreateLocationInput {
                    name: "Van".to_string(),
                    kind: LocationKind::Truck,
                    parent_id: None,
                },
            )
            .await
            .unwrap();

        let partners = PartnerService::new(store.clone());
        let vendor = partners
            .create_vendor(
                &manager,
                VendorInput {
                    name: "Roastery Supply".to_string(),
                    contact_name: None,
                    contact_phone: None,
                    contact_email: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        let partner_store = partners
            .create_store(
                &manager,
                CreateStoreInput {
                    name: "Corner Market".to_string(),
                    contact_name: Some("Lee".to_string()),
                    contact_phone: None,
                    address: None,
                },
            )
            .await
            .unwrap();

        let product = CatalogService::new(store.clone())
            .create_product(
                &manager,
                CreateProductInput {
                    name: "House Blend".to_string(),
                    variant: Some("Medium".to_string()),
                    sku: "HB-MED".to_string(),
                    packs_per_box: 12,
                    notes: None,
                    pricing: Some(PricingInput {
                        cost_per_box: dec("20.00"),
                        retail_price_per_pack: dec("4.00"),
                        retail_price_per_box: dec("42.00"),
                        wholesale_price_per_box: dec("30.00"),
                    }),
                },
            )
            .await
            .unwrap();

        Self {
            memory,
            store,
            storage,
            shelf,
            truck,
            vendor_id: vendor.id,
            store_id: partner_store.store.id,
            store_location: partner_store.location,
            product_id: product.product.id,
        }
    }

    pub fn movements(&self) -> MovementService {
        MovementService::new(self.store.clone())
    }

    /// Another priced product, wholesale 25.00 per box
    pub async fn add_product(&self, name: &str, sku: &str) -> Uuid {
        CatalogService::new(self.store.clone())
            .create_product(
                &manager(),
                CreateProductInput {
                    name: name.to_string(),
                    variant: None,
                    sku: sku.to_string(),
                    packs_per_box: 6,
                    notes: None,
                    pricing: Some(PricingInput {
                        cost_per_box: dec("15.00"),
                        retail_price_per_pack: dec("5.00"),
                        retail_price_per_box: dec("28.00"),
                        wholesale_price_per_box: dec("25.00"),
                    }),
                },
            )
            .await
            .unwrap()
            .product
            .id
    }

    /// Receive boxes into the storage room
    pub async fn receive(&self, boxes: i64) -> Movement {
        self.receive_product(self.product_id, boxes).await
    }

    pub async fn receive_product(&self, product_id: Uuid, boxes: i64) -> Movement {
        let mut input = AppendMovementInput::new(
            MovementAction::Receive,
            product_id,
            UnitType::Box,
            boxes,
        )
        .to_location(self.storage.id);
        input.vendor_id = Some(self.vendor_id);
        input.cost_per_box = Some(dec("20.00"));

        self.movements().append_movement(&staff(), input).await.unwrap()
    }

    /// Deliver boxes from storage to the partner store
    pub async fn deliver(&self, boxes: i64, performed_at: DateTime<Utc>) -> Movement {
        self.deliver_product(self.product_id, boxes, performed_at).await
    }

    pub async fn deliver_product(
        &self,
        product_id: Uuid,
        boxes: i64,
        performed_at: DateTime<Utc>,
    ) -> Movement {
        let mut input = AppendMovementInput::new(
            MovementAction::DeliverToStore,
            product_id,
            UnitType::Box,
            boxes,
        )
        .from_location(self.storage.id)
        .to_location(self.store_location.id);
        input.performed_at = Some(performed_at);

        self.movements().append_movement(&staff(), input).await.unwrap()
    }

    /// Take boxes back from the partner store into storage
    pub async fn take_back(&self, boxes: i64, performed_at: DateTime<Utc>) -> Movement {
        let mut input = AppendMovementInput::new(
            MovementAction::ReturnFromStore,
            self.product_id,
            UnitType::Box,
            boxes,
        )
        .from_location(self.store_location.id)
        .to_location(self.storage.id);
        input.performed_at = Some(performed_at);

        self.movements().append_movement(&staff(), input).await.unwrap()
    }

    pub async fn on_hand(&self, unit_type: UnitType, location_id: Uuid) -> i64 {
        consignment_ledger::services::InventoryService::new(self.store.clone())
            .on_hand(self.product_id, unit_type, location_id)
            .await
            .unwrap()
    }
}
