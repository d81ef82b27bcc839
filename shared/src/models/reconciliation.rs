//! Store reconciliation arithmetic
//!
//! A store's physical counts are replayed in date order against the ledger's
//! deliveries and returns. Each count closes the window `(previous date, date]`.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::UnitType;
use super::movement::{Movement, MovementAction};
use super::partner::StoreCount;

/// Deliveries and returns inside one count window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowTotals {
    pub delivered: i64,
    pub returned: i64,
}

/// Sum contributing box deliveries and returns for (store, product) whose UTC
/// date falls in `(after, through]`. `after = None` opens the window to the past.
pub fn window_totals<'a, I>(
    movements: I,
    store_id: Uuid,
    product_id: Uuid,
    after: Option<NaiveDate>,
    through: NaiveDate,
) -> WindowTotals
where
    I: IntoIterator<Item = &'a Movement>,
{
    let mut totals = WindowTotals::default();

    for m in movements.into_iter().filter(|m| {
        m.contributes()
            && m.store_id == Some(store_id)
            && m.product_id == product_id
            && m.unit_type == UnitType::Box
            && in_window(m.performed_on(), after, through)
    }) {
        match m.action {
            MovementAction::DeliverToStore => totals.delivered += m.quantity,
            MovementAction::ReturnFromStore => totals.returned += m.quantity,
            _ => {}
        }
    }

    totals
}

fn in_window(date: NaiveDate, after: Option<NaiveDate>, through: NaiveDate) -> bool {
    after.map_or(true, |after| date > after) && date <= through
}

/// Result of reconciling one count against its window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodOutcome {
    pub previous_remaining: i64,
    pub delivered: i64,
    pub returned: i64,
    pub expected_max: i64,
    pub counted_remaining: i64,
    /// Negative when the count is higher than the ledger allows
    pub boxes_sold: i64,
}

impl PeriodOutcome {
    /// The count shows more stock than the ledger can account for
    pub fn is_mismatch(&self) -> bool {
        self.counted_remaining > self.expected_max
    }

    pub fn is_shrinkage(&self) -> bool {
        self.boxes_sold < 0
    }

    pub fn has_anomaly(&self) -> bool {
        self.is_mismatch() || self.is_shrinkage()
    }

    /// Negative sales owe nothing
    pub fn amount_owed(&self, price_per_box: Decimal) -> Decimal {
        Decimal::from(self.boxes_sold.max(0)) * price_per_box
    }
}

pub fn reconcile_period(previous_remaining: i64, window: WindowTotals, counted_remaining: i64) -> PeriodOutcome {
    let expected_max = previous_remaining + window.delivered - window.returned;

    PeriodOutcome {
        previous_remaining,
        delivered: window.delivered,
        returned: window.returned,
        expected_max,
        counted_remaining,
        boxes_sold: expected_max - counted_remaining,
    }
}

/// One replayed count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountPeriod {
    pub count_id: Uuid,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub count_date: NaiveDate,
    pub outcome: PeriodOutcome,
}

/// Replay the counts of a single (store, product) in date order.
///
/// The first count is measured against a synthetic previous count of zero
/// remaining at the beginning of time.
pub fn replay_counts(counts: &[StoreCount], movements: &[Movement]) -> Vec<CountPeriod> {
    let mut ordered: Vec<&StoreCount> = counts.iter().collect();
    ordered.sort_by_key(|c| (c.count_date, c.created_at));

    let mut previous: Option<(NaiveDate, i64)> = None;
    let mut periods = Vec::with_capacity(ordered.len());

    for count in ordered {
        let (after, previous_remaining) = match previous {
            Some((date, remaining)) => (Some(date), remaining),
            None => (None, 0),
        };
        let window = window_totals(movements, count.store_id, count.product_id, after, count.count_date);

        periods.push(CountPeriod {
            count_id: count.id,
            store_id: count.store_id,
            product_id: count.product_id,
            count_date: count.count_date,
            outcome: reconcile_period(previous_remaining, window, count.boxes_remaining),
        });
        previous = Some((count.count_date, count.boxes_remaining));
    }

    periods
}

/// Price frozen on the latest contributing delivery on or before `through`
pub fn latest_delivery_price<'a, I>(
    movements: I,
    store_id: Uuid,
    product_id: Uuid,
    through: NaiveDate,
) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a Movement>,
{
    movements
        .into_iter()
        .filter(|m| {
            m.contributes()
                && m.action == MovementAction::DeliverToStore
                && m.store_id == Some(store_id)
                && m.product_id == product_id
                && m.performed_on() <= through
                && m.price_snapshot.is_some()
        })
        .max_by_key(|m| m.performed_at)
        .and_then(|m| m.price_snapshot)
}

/// Money rounding, applied to final figures only
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// What a store owes and has paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreBalance {
    pub total_owed: Decimal,
    pub total_paid: Decimal,
    pub balance: Decimal,
}

impl StoreBalance {
    /// Takes unrounded totals; rounding happens once, here
    pub fn from_totals(total_owed: Decimal, total_paid: Decimal) -> Self {
        Self {
            total_owed: round_money(total_owed),
            total_paid: round_money(total_paid),
            balance: round_money(total_owed - total_paid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn delivery(store: Uuid, product: Uuid, day: u32, qty: i64, price: &str) -> Movement {
        Movement {
            id: Uuid::new_v4(),
            action: MovementAction::DeliverToStore,
            product_id: product,
            unit_type: UnitType::Box,
            quantity: qty,
            from_location_id: Some(Uuid::new_v4()),
            to_location_id: Some(Uuid::new_v4()),
            vendor_id: None,
            store_id: Some(store),
            cost_snapshot: None,
            price_snapshot: Some(dec(price)),
            adjustment_reason: None,
            approved_by: None,
            performed_by: "driver_1".to_string(),
            notes: None,
            barcode_scanned: None,
            performed_at: Utc.with_ymd_and_hms(2024, 3, day, 15, 0, 0).unwrap(),
            is_reversal: false,
            reverses_id: None,
            reversed_by_id: None,
            linked_movement_id: None,
        }
    }

    fn count(store: Uuid, product: Uuid, day: u32, remaining: i64) -> StoreCount {
        StoreCount {
            id: Uuid::new_v4(),
            store_id: store,
            product_id: product,
            count_date: date(day),
            boxes_remaining: remaining,
            counted_by: "driver_1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normal_period() {
        let outcome = reconcile_period(10, WindowTotals { delivered: 20, returned: 0 }, 5);

        assert_eq!(outcome.expected_max, 30);
        assert_eq!(outcome.boxes_sold, 25);
        assert_eq!(outcome.amount_owed(dec("12.50")), dec("312.50"));
        assert!(!outcome.has_anomaly());
    }

    #[test]
    fn test_overcount_raises_both_anomalies() {
        let outcome = reconcile_period(10, WindowTotals { delivered: 20, returned: 0 }, 35);

        assert_eq!(outcome.boxes_sold, -5);
        assert!(outcome.is_mismatch());
        assert!(outcome.is_shrinkage());
        assert_eq!(outcome.amount_owed(dec("12.50")), Decimal::ZERO);
    }

    #[test]
    fn test_no_deliveries_sells_down_previous_stock() {
        let outcome = reconcile_period(10, WindowTotals::default(), 0);

        assert_eq!(outcome.expected_max, 10);
        assert_eq!(outcome.boxes_sold, 10);
        assert!(!outcome.has_anomaly());
    }

    #[test]
    fn test_returns_reduce_expected() {
        let outcome = reconcile_period(10, WindowTotals { delivered: 5, returned: 3 }, 12);
        assert_eq!(outcome.expected_max, 12);
        assert_eq!(outcome.boxes_sold, 0);
    }

    #[test]
    fn test_window_is_open_closed() {
        let store = Uuid::new_v4();
        let product = Uuid::new_v4();
        let ledger = vec![
            delivery(store, product, 1, 4, "10"),
            delivery(store, product, 2, 6, "10"),
            delivery(store, product, 3, 8, "10"),
        ];

        let totals = window_totals(&ledger, store, product, Some(date(1)), date(2));
        assert_eq!(totals.delivered, 6);

        let totals = window_totals(&ledger, store, product, None, date(3));
        assert_eq!(totals.delivered, 18);
    }

    #[test]
    fn test_reversed_delivery_leaves_window() {
        let store = Uuid::new_v4();
        let product = Uuid::new_v4();
        let mut original = delivery(store, product, 2, 6, "10");
        let reversal = original.reversal("wrong store", "manager_1", Utc::now());
        original.reversed_by_id = Some(reversal.id);
        let ledger = vec![original, reversal];

        let totals = window_totals(&ledger, store, product, None, date(31));
        assert_eq!(totals, WindowTotals::default());
    }

    #[test]
    fn test_replay_chains_previous_counts() {
        let store = Uuid::new_v4();
        let product = Uuid::new_v4();
        let ledger = vec![
            delivery(store, product, 1, 10, "10"),
            delivery(store, product, 5, 20, "10"),
        ];
        let counts = vec![count(store, product, 8, 5), count(store, product, 2, 10)];

        let periods = replay_counts(&counts, &ledger);

        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].count_date, date(2));
        assert_eq!(periods[0].outcome.boxes_sold, 0);
        assert_eq!(periods[1].outcome.expected_max, 30);
        assert_eq!(periods[1].outcome.boxes_sold, 25);
    }

    #[test]
    fn test_latest_delivery_price() {
        let store = Uuid::new_v4();
        let product = Uuid::new_v4();
        let ledger = vec![
            delivery(store, product, 1, 1, "10.00"),
            delivery(store, product, 4, 1, "11.00"),
            delivery(store, product, 9, 1, "12.00"),
        ];

        assert_eq!(latest_delivery_price(&ledger, store, product, date(5)), Some(dec("11.00")));
        assert_eq!(latest_delivery_price(&ledger, Uuid::new_v4(), product, date(5)), None);
    }

    #[test]
    fn test_balance_rounds_final_figures_only() {
        let third = dec("10") / dec("3");
        let owed = third * dec("3");
        let balance = StoreBalance::from_totals(owed, dec("5"));

        assert_eq!(balance.total_owed, dec("10.00"));
        assert_eq!(balance.balance, dec("5.00"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Expected stock is always fully split between sold and counted
        #[test]
        fn prop_sold_plus_counted_is_expected(
            previous in 0i64..500,
            delivered in 0i64..500,
            returned in 0i64..500,
            counted in 0i64..1000,
        ) {
            let outcome = reconcile_period(previous, WindowTotals { delivered, returned }, counted);
            prop_assert_eq!(outcome.boxes_sold + outcome.counted_remaining, outcome.expected_max);
            prop_assert_eq!(outcome.is_mismatch(), outcome.is_shrinkage());
        }

        /// Owed is never negative
        #[test]
        fn prop_amount_owed_non_negative(
            previous in 0i64..500,
            delivered in 0i64..500,
            counted in 0i64..1000,
            cents in 0i64..100_000,
        ) {
            let outcome = reconcile_period(previous, WindowTotals { delivered, returned: 0 }, counted);
            let price = Decimal::new(cents, 2);
            prop_assert!(outcome.amount_owed(price) >= Decimal::ZERO);
        }
    }
}
