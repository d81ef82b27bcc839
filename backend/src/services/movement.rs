//! Movement ledger service
//!
//! The only way rows enter the ledger. Every append is authorized, validated
//! against the action's location and unit rules, checked for sufficient
//! on-hand and stamped with its cost or price snapshot before the store sees
//! it. The sufficiency check is advisory: concurrent appends can still drive
//! a figure negative, and the alert scan reports it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    clean_optional, on_hand, validate_location_kinds, validate_required_text, validate_unit_type,
    Actor, AdjustmentDirection, AppRole, Location, LocationKind, Movement, MovementAction, MovementFilter,
    PaginatedResponse, Pagination, Product, UnitType,
};
use uuid::Uuid;
use validator::Validate;

use super::pricing::{non_negative, PricingService};
use crate::error::{AppError, AppResult};
use crate::middleware::require_role;
use crate::store::LedgerStore;

/// Movement service
#[derive(Clone)]
pub struct MovementService {
    store: Arc<dyn LedgerStore>,
    pricing: PricingService,
}

/// Input for appending one ledger row
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppendMovementInput {
    pub action: MovementAction,
    pub product_id: Uuid,
    pub unit_type: UnitType,
    #[validate(range(min = 1, message = "Quantity must be > 0"))]
    pub quantity: i64,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    /// RECEIVE only
    pub vendor_id: Option<Uuid>,
    /// Must agree with the store location when given
    pub store_id: Option<Uuid>,
    /// RECEIVE only
    pub cost_per_box: Option<Decimal>,
    /// Retail sales only; the row keeps `unit_price * quantity`
    pub unit_price: Option<Decimal>,
    /// ADJUSTMENT only
    pub adjustment_reason: Option<String>,
    pub notes: Option<String>,
    pub barcode_scanned: Option<String>,
    /// Back-entry of paper records; defaults to now
    pub performed_at: Option<DateTime<Utc>>,
}

impl AppendMovementInput {
    /// Minimal input; optional fields start empty
    pub fn new(
        action: MovementAction,
        product_id: Uuid,
        unit_type: UnitType,
        quantity: i64,
    ) -> Self {
        Self {
            action,
            product_id,
            unit_type,
            quantity,
            from_location_id: None,
            to_location_id: None,
            vendor_id: None,
            store_id: None,
            cost_per_box: None,
            unit_price: None,
            adjustment_reason: None,
            notes: None,
            barcode_scanned: None,
            performed_at: None,
        }
    }

    pub fn from_location(mut self, location_id: Uuid) -> Self {
        self.from_location_id = Some(location_id);
        self
    }

    pub fn to_location(mut self, location_id: Uuid) -> Self {
        self.to_location_id = Some(location_id);
        self
    }
}

/// A manager's correction at one location
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustInput {
    pub product_id: Uuid,
    pub unit_type: UnitType,
    pub quantity: i64,
    pub direction: AdjustmentDirection,
    pub location_id: Uuid,
    pub reason: String,
    pub notes: Option<String>,
    pub performed_at: Option<DateTime<Utc>>,
}

/// Input for converting boxes into packs at one location
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConvertInput {
    pub product_id: Uuid,
    /// Boxes to open
    #[validate(range(min = 1, message = "Quantity must be > 0"))]
    pub quantity: i64,
    pub location_id: Uuid,
    pub notes: Option<String>,
    pub barcode_scanned: Option<String>,
    pub performed_at: Option<DateTime<Utc>>,
}

/// The two linked rows a conversion wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub box_movement_id: Uuid,
    pub pack_movement_id: Uuid,
    pub packs_created: i64,
}

/// Field presence rules that depend only on the action
fn check_action_fields(input: &AppendMovementInput) -> AppResult<()> {
    let action = input.action;

    match action {
        MovementAction::Receive => {
            if input.vendor_id.is_none() {
                return Err(AppError::field("vendor_id", "RECEIVE requires a vendor"));
            }
            let cost = input
                .cost_per_box
                .ok_or_else(|| AppError::field("cost_per_box", "RECEIVE requires a cost per box"))?;
            non_negative("cost_per_box", cost)?;
        }
        _ => {
            if input.vendor_id.is_some() {
                return Err(AppError::field("vendor_id", "A vendor is only recorded on RECEIVE"));
            }
            if input.cost_per_box.is_some() {
                return Err(AppError::field("cost_per_box", "A cost per box is only recorded on RECEIVE"));
            }
        }
    }

    match action {
        MovementAction::Adjustment => {
            let reason = input.adjustment_reason.as_deref().unwrap_or("");
            validate_required_text(reason).map_err(|_| {
                AppError::field("adjustment_reason", "An adjustment requires a reason")
            })?;
        }
        _ => {
            if input.adjustment_reason.is_some() {
                return Err(AppError::field(
                    "adjustment_reason",
                    "A reason is only recorded on ADJUSTMENT",
                ));
            }
        }
    }

    match action {
        MovementAction::SaleRetailPack | MovementAction::SaleRetailBox => {
            let price = input
                .unit_price
                .ok_or_else(|| AppError::field("unit_price", "A sale requires a price per unit"))?;
            non_negative("unit_price", price)?;
        }
        _ => {
            if input.unit_price.is_some() {
                return Err(AppError::field("unit_price", "A unit price is only recorded on sales"));
            }
        }
    }

    Ok(())
}

/// Store a row touches, taken from its STORE-kind side
fn derive_store(
    from: Option<&Location>,
    to: Option<&Location>,
    given: Option<Uuid>,
) -> AppResult<Option<Uuid>> {
    let derived = [from, to]
        .into_iter()
        .flatten()
        .find(|l| l.kind == LocationKind::Store)
        .and_then(|l| l.store_id);

    match (derived, given) {
        (Some(derived), Some(given)) if derived != given => Err(AppError::field(
            "store_id",
            "Store does not match the store location",
        )),
        (Some(derived), _) => Ok(Some(derived)),
        (None, Some(_)) => Err(AppError::field(
            "store_id",
            "A store is only recorded on store-facing movements",
        )),
        (None, None) => Ok(None),
    }
}

fn ledger_row(
    action: MovementAction,
    product_id: Uuid,
    unit_type: UnitType,
    quantity: i64,
    actor: &Actor,
    performed_at: DateTime<Utc>,
) -> Movement {
    Movement {
        id: Uuid::new_v4(),
        action,
        product_id,
        unit_type,
        quantity,
        from_location_id: None,
        to_location_id: None,
        vendor_id: None,
        store_id: None,
        cost_snapshot: None,
        price_snapshot: None,
        adjustment_reason: None,
        approved_by: None,
        performed_by: actor.user_id.clone(),
        notes: None,
        barcode_scanned: None,
        performed_at,
        is_reversal: false,
        reverses_id: None,
        reversed_by_id: None,
        linked_movement_id: None,
    }
}

impl MovementService {
    /// Create a new MovementService instance
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            pricing: PricingService::new(store.clone()),
            store,
        }
    }

    /// Validate and append one ledger row
    pub async fn append_movement(
        &self,
        actor: &Actor,
        input: AppendMovementInput,
    ) -> AppResult<Movement> {
        let action = input.action;
        let required = match action {
            MovementAction::Adjustment => AppRole::Manager,
            _ => AppRole::Staff,
        };
        require_role(actor, required, action.label())?;

        if action == MovementAction::ConvertBoxToPacks {
            return Err(AppError::field(
                "action",
                "Boxes are converted to packs through the conversion operation",
            ));
        }

        input.validate()?;
        validate_unit_type(action, input.unit_type)
            .map_err(|msg| AppError::field("unit_type", msg))?;
        check_action_fields(&input)?;

        let product = self.active_product(input.product_id).await?;
        let from = self
            .active_location(input.from_location_id, "from_location_id")
            .await?;
        let to = self
            .active_location(input.to_location_id, "to_location_id")
            .await?;

        let same_location = matches!((&from, &to), (Some(f), Some(t)) if f.id == t.id);
        validate_location_kinds(
            action,
            from.as_ref().map(|l| l.kind),
            to.as_ref().map(|l| l.kind),
            same_location,
        )
        .map_err(AppError::ValidationError)?;

        let store_id = derive_store(from.as_ref(), to.as_ref(), input.store_id)?;

        if let Some(vendor_id) = input.vendor_id {
            self.store
                .get_vendor(vendor_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Vendor".to_string()))?;
        }

        let price_snapshot = match action {
            MovementAction::DeliverToStore => {
                let store_id = store_id.ok_or_else(|| {
                    AppError::field("to_location_id", "Store location is not linked to a store")
                })?;
                Some(self.pricing.wholesale_price(product.id, store_id).await?)
            }
            MovementAction::SaleRetailPack | MovementAction::SaleRetailBox => input
                .unit_price
                .map(|price| price * Decimal::from(input.quantity)),
            _ => None,
        };

        if let Some(from) = &from {
            self.ensure_on_hand(&product, input.unit_type, from, input.quantity)
                .await?;
        }

        let performed_at = input.performed_at.unwrap_or_else(Utc::now);
        let mut row = ledger_row(
            action,
            product.id,
            input.unit_type,
            input.quantity,
            actor,
            performed_at,
        );
        row.from_location_id = from.as_ref().map(|l| l.id);
        row.to_location_id = to.as_ref().map(|l| l.id);
        row.vendor_id = input.vendor_id;
        row.store_id = store_id;
        row.cost_snapshot = input.cost_per_box;
        row.price_snapshot = price_snapshot;
        row.notes = clean_optional(input.notes);
        row.barcode_scanned = clean_optional(input.barcode_scanned);
        if action == MovementAction::Adjustment {
            row.adjustment_reason = clean_optional(input.adjustment_reason);
            row.approved_by = Some(actor.user_id.clone());
        }

        self.store.append_movements(std::slice::from_ref(&row)).await?;

        tracing::info!(
            movement_id = %row.id,
            action = %row.action,
            product_id = %row.product_id,
            unit_type = %row.unit_type,
            quantity = row.quantity,
            performed_by = %row.performed_by,
            "Movement appended"
        );

        Ok(row)
    }

    /// Add stock to or remove it from one location. Removing stock that is
    /// not on hand is refused like any other depleting movement.
    pub async fn adjust(&self, actor: &Actor, input: AdjustInput) -> AppResult<Movement> {
        let (from, to) = input.direction.sides(input.location_id);
        let mut append = AppendMovementInput::new(
            MovementAction::Adjustment,
            input.product_id,
            input.unit_type,
            input.quantity,
        );
        append.from_location_id = from;
        append.to_location_id = to;
        append.adjustment_reason = Some(input.reason);
        append.notes = input.notes;
        append.performed_at = input.performed_at;

        self.append_movement(actor, append).await
    }

    /// Open boxes into packs: a box row leaving the location and a linked
    /// pack row entering it, written together or not at all
    pub async fn convert_box_to_packs(
        &self,
        actor: &Actor,
        input: ConvertInput,
    ) -> AppResult<ConversionResult> {
        require_role(actor, AppRole::Staff, MovementAction::ConvertBoxToPacks.label())?;
        input.validate()?;

        let product = self.active_product(input.product_id).await?;
        let location = self
            .active_location(Some(input.location_id), "location_id")
            .await?
            .ok_or_else(|| AppError::NotFound("Location".to_string()))?;

        validate_location_kinds(
            MovementAction::ConvertBoxToPacks,
            Some(location.kind),
            Some(location.kind),
            true,
        )
        .map_err(AppError::ValidationError)?;

        let available = self
            .count_on_hand(product.id, UnitType::Box, location.id)
            .await?;
        if available < input.quantity {
            return Err(AppError::InsufficientInventory(format!(
                "Only {} boxes on hand. Cannot convert {}.",
                available, input.quantity
            )));
        }

        let packs_created = input
            .quantity
            .checked_mul(i64::from(product.packs_per_box))
            .ok_or_else(|| AppError::field("quantity", "Quantity is too large"))?;

        let performed_at = input.performed_at.unwrap_or_else(Utc::now);

        let mut box_row = ledger_row(
            MovementAction::ConvertBoxToPacks,
            product.id,
            UnitType::Box,
            input.quantity,
            actor,
            performed_at,
        );
        box_row.from_location_id = Some(location.id);
        box_row.notes = clean_optional(input.notes);
        box_row.barcode_scanned = clean_optional(input.barcode_scanned);

        let mut pack_row = ledger_row(
            MovementAction::ConvertBoxToPacks,
            product.id,
            UnitType::Pack,
            packs_created,
            actor,
            performed_at,
        );
        pack_row.to_location_id = Some(location.id);
        pack_row.linked_movement_id = Some(box_row.id);

        let result = ConversionResult {
            box_movement_id: box_row.id,
            pack_movement_id: pack_row.id,
            packs_created,
        };

        self.store.append_movements(&[box_row, pack_row]).await?;

        tracing::info!(
            product_id = %product.id,
            location_id = %location.id,
            boxes = input.quantity,
            packs = packs_created,
            "Boxes converted to packs"
        );

        Ok(result)
    }

    /// Ledger history, newest first
    pub async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Movement>> {
        let (rows, total) = self.store.page_movements(filter, pagination).await?;
        Ok(PaginatedResponse::new(rows, pagination, total))
    }

    pub async fn get_movement(&self, movement_id: Uuid) -> AppResult<Movement> {
        self.store
            .get_movement(movement_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Movement".to_string()))
    }

    async fn active_product(&self, product_id: Uuid) -> AppResult<Product> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        if !product.is_active() {
            return Err(AppError::field(
                "product_id",
                format!("{} is inactive", product.display_name()),
            ));
        }
        Ok(product)
    }

    async fn active_location(
        &self,
        location_id: Option<Uuid>,
        field: &str,
    ) -> AppResult<Option<Location>> {
        let Some(location_id) = location_id else {
            return Ok(None);
        };

        let location = self
            .store
            .get_location(location_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Location".to_string()))?;

        if !location.is_active() {
            return Err(AppError::field(field, format!("{} is inactive", location.name)));
        }
        Ok(Some(location))
    }

    async fn count_on_hand(
        &self,
        product_id: Uuid,
        unit_type: UnitType,
        location_id: Uuid,
    ) -> AppResult<i64> {
        let filter = MovementFilter {
            product_id: Some(product_id),
            unit_type: Some(unit_type),
            location_id: Some(location_id),
            ..Default::default()
        };
        let movements = self.store.list_movements(&filter).await?;
        Ok(on_hand(&movements, product_id, unit_type, location_id))
    }

    async fn ensure_on_hand(
        &self,
        product: &Product,
        unit_type: UnitType,
        location: &Location,
        quantity: i64,
    ) -> AppResult<()> {
        let available = self
            .count_on_hand(product.id, unit_type, location.id)
            .await?;

        if available < quantity {
            return Err(AppError::InsufficientInventory(format!(
                "Only {} {} on hand at {}. Need {}.",
                available, unit_type, location.name, quantity
            )));
        }
        Ok(())
    }
}
