//! Store reconciliation: counts, payments and balances
//!
//! Store balances are never stored. Each request replays every count of the
//! store against the ledger and sums payments, rounding only the final figures.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    clean_optional, latest_delivery_price, on_hand, reconcile_period, replay_counts, window_totals,
    Actor, Alert, AlertType, AppRole, LocationKind, Movement, MovementAction, MovementFilter,
    PeriodOutcome, StoreBalance, StoreCount, StorePayment, UnitType,
};
use uuid::Uuid;
use validator::Validate;

use super::inventory::{InventoryLine, InventoryService};
use super::pricing::PricingService;
use crate::config::PricingBasis;
use crate::error::{AppError, AppResult};
use crate::middleware::require_role;
use crate::store::LedgerStore;

/// Reconciliation service
#[derive(Clone)]
pub struct ReconciliationService {
    store: Arc<dyn LedgerStore>,
    pricing: PricingService,
    basis: PricingBasis,
}

/// One product line of a physical count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountEntry {
    pub product_id: Uuid,
    pub boxes_remaining: i64,
}

/// A physical count of a store on one date
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitCountInput {
    pub count_date: NaiveDate,
    #[validate(length(min = 1, message = "At least one product must be counted"))]
    pub entries: Vec<CountEntry>,
}

/// Outcome of one counted product
#[derive(Debug, Clone, Serialize)]
pub struct CountEntryResult {
    pub count_id: Uuid,
    pub product_id: Uuid,
    #[serde(flatten)]
    pub outcome: PeriodOutcome,
    pub amount_owed: Decimal,
    pub has_anomaly: bool,
}

/// Input for recording a payment
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentInput {
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// What to count at a store
#[derive(Debug, Clone, Serialize)]
pub struct CountSheet {
    pub store_id: Uuid,
    pub store_name: String,
    pub products: Vec<CountSheetLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountSheetLine {
    pub product_id: Uuid,
    pub name: String,
    pub variant: Option<String>,
    pub last_remaining: Option<i64>,
    pub last_count_date: Option<NaiveDate>,
    pub delivered_since: i64,
}

/// Ledger box on-hand at a store versus its latest count
#[derive(Debug, Clone, Serialize)]
pub struct CountDiscrepancy {
    pub store_id: Uuid,
    pub store_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub ledger_on_hand: i64,
    pub counted: i64,
    pub count_date: NaiveDate,
    /// Ledger minus count
    pub discrepancy: i64,
}

/// One store in the balance overview
#[derive(Debug, Clone, Serialize)]
pub struct StoreBalanceLine {
    pub store_id: Uuid,
    pub store_name: String,
    #[serde(flatten)]
    pub balance: StoreBalance,
    pub last_payment_date: Option<NaiveDate>,
    pub days_since_payment: Option<i64>,
    /// Owes money and last paid more than the overdue window ago
    pub is_overdue: bool,
}

/// Balances of every active store, largest balance first
#[derive(Debug, Clone, Serialize)]
pub struct BalanceOverview {
    pub stores: Vec<StoreBalanceLine>,
    pub totals: StoreBalance,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShrinkageReport {
    pub negative_inventory: Vec<InventoryLine>,
    pub count_discrepancies: Vec<CountDiscrepancy>,
}

/// Alerts raised by one reconciled count
fn anomaly_alerts(store_id: Uuid, product_id: Uuid, outcome: &PeriodOutcome) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if outcome.is_mismatch() {
        alerts.push(
            Alert::open(
                AlertType::ReconciliationMismatch,
                format!(
                    "Count exceeds expected: {} counted, max {}",
                    outcome.counted_remaining, outcome.expected_max
                ),
                "Store count shows more boxes than the ledger expects. Possible unlogged delivery."
                    .to_string(),
            )
            .with_product(product_id)
            .with_store(store_id),
        );
    }

    if outcome.is_shrinkage() {
        alerts.push(
            Alert::open(
                AlertType::ShrinkageDetected,
                format!("Negative sales detected: {} boxes", outcome.boxes_sold),
                format!(
                    "Expected max {} but counted {}. Prev: {}, delivered: {}, returned: {}",
                    outcome.expected_max,
                    outcome.counted_remaining,
                    outcome.previous_remaining,
                    outcome.delivered,
                    outcome.returned
                ),
            )
            .with_product(product_id)
            .with_store(store_id),
        );
    }

    alerts
}

impl ReconciliationService {
    /// Create a new ReconciliationService instance
    pub fn new(store: Arc<dyn LedgerStore>, basis: PricingBasis) -> Self {
        Self {
            pricing: PricingService::new(store.clone()),
            store,
            basis,
        }
    }

    /// Record a physical count and reconcile each entry against the ledger.
    ///
    /// Every entry is validated and priced first; the counts and their alerts
    /// are then written in one transaction. Anomalies raise alerts but never
    /// fail the submission.
    pub async fn submit_store_count(
        &self,
        actor: &Actor,
        store_id: Uuid,
        input: SubmitCountInput,
    ) -> AppResult<Vec<CountEntryResult>> {
        require_role(actor, AppRole::Staff, "Submitting store counts")?;
        input.validate()?;

        let mut seen = Vec::with_capacity(input.entries.len());
        for entry in &input.entries {
            if entry.boxes_remaining < 0 {
                return Err(AppError::field(
                    "boxes_remaining",
                    "Boxes remaining cannot be negative",
                ));
            }
            if seen.contains(&entry.product_id) {
                return Err(AppError::field(
                    "entries",
                    "Each product can only be counted once per submission",
                ));
            }
            seen.push(entry.product_id);
        }

        self.store
            .get_store(store_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Store".to_string()))?;

        let movements = self.store_movements(store_id).await?;
        let counts = self.store.list_store_counts(Some(store_id)).await?;
        let count_date = input.count_date;
        let now = Utc::now();

        // Validate and price everything first
        let mut staged = Vec::with_capacity(input.entries.len());
        for entry in &input.entries {
            self.store
                .get_product(entry.product_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

            let prior: Vec<&StoreCount> = counts
                .iter()
                .filter(|c| c.product_id == entry.product_id)
                .collect();

            if prior.iter().any(|c| c.count_date == count_date) {
                return Err(AppError::DuplicateEntry("store count".to_string()));
            }

            let previous = prior
                .iter()
                .filter(|c| c.count_date < count_date)
                .max_by_key(|c| (c.count_date, c.created_at));
            let (after, previous_remaining) =
                previous.map_or((None, 0), |c| (Some(c.count_date), c.boxes_remaining));

            let window = window_totals(&movements, store_id, entry.product_id, after, count_date);
            let outcome = reconcile_period(previous_remaining, window, entry.boxes_remaining);

            let amount_owed = if outcome.boxes_sold > 0 {
                let price = self
                    .period_price(&movements, store_id, entry.product_id, count_date)
                    .await?;
                outcome.amount_owed(price)
            } else {
                Decimal::ZERO
            };

            let count = StoreCount {
                id: Uuid::new_v4(),
                store_id,
                product_id: entry.product_id,
                count_date,
                boxes_remaining: entry.boxes_remaining,
                counted_by: actor.user_id.clone(),
                created_at: now,
            };
            staged.push((count, outcome, amount_owed));
        }

        let counts: Vec<StoreCount> = staged.iter().map(|(count, _, _)| count.clone()).collect();
        let alerts: Vec<Alert> = staged
            .iter()
            .flat_map(|(count, outcome, _)| anomaly_alerts(store_id, count.product_id, outcome))
            .collect();
        self.store.insert_store_counts(&counts, &alerts).await?;

        let mut results = Vec::with_capacity(staged.len());
        for (count, outcome, amount_owed) in staged {
            if outcome.has_anomaly() {
                tracing::warn!(
                    store_id = %store_id,
                    product_id = %count.product_id,
                    expected_max = outcome.expected_max,
                    counted = outcome.counted_remaining,
                    boxes_sold = outcome.boxes_sold,
                    "Store count disagrees with the ledger"
                );
            }

            results.push(CountEntryResult {
                count_id: count.id,
                product_id: count.product_id,
                outcome,
                amount_owed,
                has_anomaly: outcome.has_anomaly(),
            });
        }

        tracing::info!(
            store_id = %store_id,
            count_date = %count_date,
            entries = results.len(),
            alerts = alerts.len(),
            counted_by = %actor.user_id,
            "Store count submitted"
        );

        Ok(results)
    }

    /// Record money collected from a store
    pub async fn record_payment(
        &self,
        actor: &Actor,
        store_id: Uuid,
        input: RecordPaymentInput,
    ) -> AppResult<StorePayment> {
        require_role(actor, AppRole::Staff, "Recording payments")?;

        if input.amount <= Decimal::ZERO {
            return Err(AppError::field("amount", "Amount must be > 0"));
        }

        self.store
            .get_store(store_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Store".to_string()))?;

        let payment = StorePayment {
            id: Uuid::new_v4(),
            store_id,
            amount: input.amount,
            payment_date: input.payment_date,
            payment_method: clean_optional(input.payment_method),
            notes: clean_optional(input.notes),
            collected_by: actor.user_id.clone(),
            created_at: Utc::now(),
        };
        self.store.insert_payment(&payment).await?;

        tracing::info!(
            store_id = %store_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            "Payment recorded"
        );

        Ok(payment)
    }

    /// Owed, paid and outstanding for a store, replayed from scratch
    pub async fn get_store_balance(&self, store_id: Uuid) -> AppResult<StoreBalance> {
        self.require_store(store_id).await?;
        let payments = self.store.list_payments(store_id).await?;
        self.replay_balance(store_id, &payments).await
    }

    /// Balances of all active stores with their payment recency
    pub async fn balance_overview(
        &self,
        today: NaiveDate,
        overdue_days: i64,
    ) -> AppResult<BalanceOverview> {
        let mut stores = self.store.list_stores().await?;
        stores.retain(|s| s.is_active());

        let mut lines = Vec::with_capacity(stores.len());
        for store in stores {
            let payments = self.store.list_payments(store.id).await?;
            let balance = self.replay_balance(store.id, &payments).await?;

            let last_payment_date = payments.iter().map(|p| p.payment_date).max();
            let days_since_payment = last_payment_date.map(|d| (today - d).num_days());
            let is_overdue = balance.balance > Decimal::ZERO
                && days_since_payment.map_or(false, |days| days > overdue_days);

            lines.push(StoreBalanceLine {
                store_id: store.id,
                store_name: store.name,
                balance,
                last_payment_date,
                days_since_payment,
                is_overdue,
            });
        }
        lines.sort_by(|a, b| {
            b.balance
                .balance
                .cmp(&a.balance.balance)
                .then_with(|| a.store_name.cmp(&b.store_name))
        });

        let total_owed = lines.iter().map(|l| l.balance.total_owed).sum();
        let total_paid = lines.iter().map(|l| l.balance.total_paid).sum();

        Ok(BalanceOverview {
            stores: lines,
            totals: StoreBalance::from_totals(total_owed, total_paid),
        })
    }

    /// Counts recorded at a store, newest first
    pub async fn list_store_counts(&self, store_id: Uuid) -> AppResult<Vec<StoreCount>> {
        self.require_store(store_id).await?;
        let mut counts = self.store.list_store_counts(Some(store_id)).await?;
        counts.sort_by(|a, b| {
            (b.count_date, b.created_at).cmp(&(a.count_date, a.created_at))
        });
        Ok(counts)
    }

    /// Payments collected from a store, newest first
    pub async fn list_payments(&self, store_id: Uuid) -> AppResult<Vec<StorePayment>> {
        self.require_store(store_id).await?;
        let mut payments = self.store.list_payments(store_id).await?;
        payments.sort_by(|a, b| {
            (b.payment_date, b.created_at).cmp(&(a.payment_date, a.created_at))
        });
        Ok(payments)
    }

    async fn replay_balance(
        &self,
        store_id: Uuid,
        payments: &[StorePayment],
    ) -> AppResult<StoreBalance> {
        let movements = self.store_movements(store_id).await?;
        let counts = self.store.list_store_counts(Some(store_id)).await?;

        let mut by_product: BTreeMap<Uuid, Vec<StoreCount>> = BTreeMap::new();
        for count in counts {
            by_product.entry(count.product_id).or_default().push(count);
        }

        let mut total_owed = Decimal::ZERO;
        for (product_id, product_counts) in &by_product {
            for period in replay_counts(product_counts, &movements) {
                if period.outcome.boxes_sold <= 0 {
                    continue;
                }
                let price = self
                    .period_price(&movements, store_id, *product_id, period.count_date)
                    .await?;
                total_owed += period.outcome.amount_owed(price);
            }
        }

        let total_paid: Decimal = payments.iter().map(|p| p.amount).sum();

        Ok(StoreBalance::from_totals(total_owed, total_paid))
    }

    /// Products delivered to a store with their last count and deliveries since
    pub async fn count_sheet(&self, store_id: Uuid) -> AppResult<CountSheet> {
        let store = self
            .store
            .get_store(store_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Store".to_string()))?;

        let movements = self.store_movements(store_id).await?;
        let counts = self.store.list_store_counts(Some(store_id)).await?;

        let delivered: Vec<Uuid> = movements
            .iter()
            .filter(|m| m.contributes() && m.action == MovementAction::DeliverToStore)
            .map(|m| m.product_id)
            .collect();

        let mut products = self.store.list_products().await?;
        products.retain(|p| p.is_active() && delivered.contains(&p.id));
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.variant.cmp(&b.variant)));

        let lines = products
            .into_iter()
            .map(|product| {
                let last = counts
                    .iter()
                    .filter(|c| c.product_id == product.id)
                    .max_by_key(|c| (c.count_date, c.created_at));
                let after = last.map(|c| c.count_date);
                let since = window_totals(&movements, store_id, product.id, after, NaiveDate::MAX);

                CountSheetLine {
                    product_id: product.id,
                    name: product.name,
                    variant: product.variant,
                    last_remaining: last.map(|c| c.boxes_remaining),
                    last_count_date: after,
                    delivered_since: since.delivered,
                }
            })
            .collect();

        Ok(CountSheet {
            store_id,
            store_name: store.name,
            products: lines,
        })
    }

    /// Negative inventory plus stores whose latest count disagrees with the ledger
    pub async fn shrinkage_report(&self) -> AppResult<ShrinkageReport> {
        let negative_inventory = InventoryService::new(self.store.clone())
            .negative_inventory()
            .await?;

        let stores: HashMap<Uuid, String> = self
            .store
            .list_stores()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let products: HashMap<Uuid, String> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .map(|p| (p.id, p.display_name()))
            .collect();
        let store_locations: HashMap<Uuid, Uuid> = self
            .store
            .list_locations()
            .await?
            .into_iter()
            .filter(|l| l.kind == LocationKind::Store)
            .filter_map(|l| l.store_id.map(|store_id| (store_id, l.id)))
            .collect();

        let mut latest: BTreeMap<(Uuid, Uuid), StoreCount> = BTreeMap::new();
        for count in self.store.list_store_counts(None).await? {
            let key = (count.store_id, count.product_id);
            let newer = latest
                .get(&key)
                .map_or(true, |c| (count.count_date, count.created_at) > (c.count_date, c.created_at));
            if newer {
                latest.insert(key, count);
            }
        }

        let movements = self.store.list_movements(&MovementFilter::default()).await?;

        let mut discrepancies: Vec<CountDiscrepancy> = latest
            .into_values()
            .filter_map(|count| {
                let ledger_on_hand = store_locations.get(&count.store_id).map_or(0, |location_id| {
                    on_hand(&movements, count.product_id, UnitType::Box, *location_id)
                });
                let discrepancy = ledger_on_hand - count.boxes_remaining;
                (discrepancy != 0).then(|| CountDiscrepancy {
                    store_id: count.store_id,
                    store_name: stores.get(&count.store_id).cloned().unwrap_or_default(),
                    product_id: count.product_id,
                    product_name: products.get(&count.product_id).cloned().unwrap_or_default(),
                    ledger_on_hand,
                    counted: count.boxes_remaining,
                    count_date: count.count_date,
                    discrepancy,
                })
            })
            .collect();
        discrepancies.sort_by_key(|d| std::cmp::Reverse(d.discrepancy.abs()));

        Ok(ShrinkageReport {
            negative_inventory,
            count_discrepancies: discrepancies,
        })
    }

    /// Price per box a reconciled period is billed at
    async fn period_price(
        &self,
        movements: &[Movement],
        store_id: Uuid,
        product_id: Uuid,
        count_date: NaiveDate,
    ) -> AppResult<Decimal> {
        if self.basis == PricingBasis::DeliverySnapshot {
            if let Some(price) = latest_delivery_price(movements, store_id, product_id, count_date) {
                return Ok(price);
            }
        }
        self.pricing.wholesale_price(product_id, store_id).await
    }

    async fn require_store(&self, store_id: Uuid) -> AppResult<()> {
        self.store
            .get_store(store_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Store".to_string()))
    }

    async fn store_movements(&self, store_id: Uuid) -> AppResult<Vec<Movement>> {
        let filter = MovementFilter {
            store_id: Some(store_id),
            ..Default::default()
        };
        self.store.list_movements(&filter).await
    }
}
