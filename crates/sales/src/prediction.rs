//! Next-order-date prediction.
//!
//! For each customer the average gap between orders is taken over **every**
//! pair of that customer's order dates where the earlier date is strictly
//! before the later one (not just consecutive orders), rounded half-up to
//! whole days, and projected forward from the most recent order date.
//! Customers with fewer than two distinct order dates fall back to
//! [`DEFAULT_GAP_DAYS`].

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use salesdate_core::CustomerId;

use crate::customer::Customer;

/// Gap used when a customer has no pair of distinct order dates.
pub const DEFAULT_GAP_DAYS: u64 = 30;

/// A customer together with the order dates recorded for it.
///
/// Orders without an order date are not represented here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerHistory {
    pub customer: Customer,
    pub order_dates: Vec<NaiveDate>,
}

impl CustomerHistory {
    pub fn new(customer: Customer, order_dates: Vec<NaiveDate>) -> Self {
        Self {
            customer,
            order_dates,
        }
    }
}

/// Derived (never stored) prediction for one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub last_order_date: Option<NaiveDate>,
    pub next_predicted_order: Option<NaiveDate>,
}

/// Sum and count of all strictly-increasing order-date pairs.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct GapStats {
    pub pair_count: u64,
    pub total_days: u128,
}

impl GapStats {
    /// Compute pair statistics in O(n log n).
    ///
    /// After sorting, each date `d` pairs with every strictly earlier date
    /// `e`, contributing `d - e`. Summed over a run of equal dates this is
    /// `run_len * (d * earlier_count - earlier_sum)`.
    pub fn from_dates(dates: &[NaiveDate]) -> Self {
        let Some(&base) = dates.iter().min() else {
            return Self::default();
        };

        let mut offsets: Vec<u64> = dates
            .iter()
            .map(|d| d.signed_duration_since(base).num_days() as u64)
            .collect();
        offsets.sort_unstable();

        let mut stats = Self::default();
        let mut earlier_count: u64 = 0;
        let mut earlier_sum: u128 = 0;

        for run in offsets.chunk_by(|a, b| a == b) {
            let day = u128::from(run[0]);
            let run_len = run.len() as u64;

            stats.pair_count += run_len * earlier_count;
            stats.total_days +=
                u128::from(run_len) * (day * u128::from(earlier_count) - earlier_sum);

            earlier_count += run_len;
            earlier_sum += day * u128::from(run_len);
        }

        stats
    }

    /// Mean gap rounded half-up, `None` when there are no pairs.
    pub fn rounded_mean_days(&self) -> Option<u64> {
        if self.pair_count == 0 {
            return None;
        }
        let n = u128::from(self.pair_count);
        let rounded = (2 * self.total_days + n) / (2 * n);
        Some(rounded as u64)
    }
}

/// Average gap in days for a set of order dates (default when no pairs).
pub fn average_gap_days(order_dates: &[NaiveDate]) -> u64 {
    GapStats::from_dates(order_dates)
        .rounded_mean_days()
        .unwrap_or(DEFAULT_GAP_DAYS)
}

/// Predict the next order date for one customer.
pub fn predict(customer: &Customer, order_dates: &[NaiveDate]) -> Prediction {
    let last_order_date = order_dates.iter().max().copied();
    let next_predicted_order = last_order_date.and_then(|last| {
        last.checked_add_days(Days::new(average_gap_days(order_dates)))
    });

    Prediction {
        customer_id: customer.id.clone(),
        customer_name: customer.name.clone(),
        last_order_date,
        next_predicted_order,
    }
}

/// Predict for every history, ordered by customer name then identifier.
pub fn predict_all(histories: impl IntoIterator<Item = CustomerHistory>) -> Vec<Prediction> {
    let mut predictions: Vec<Prediction> = histories
        .into_iter()
        .map(|h| predict(&h.customer, &h.order_dates))
        .collect();

    predictions.sort_by(|a, b| {
        a.customer_name
            .cmp(&b.customer_name)
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    predictions
}
