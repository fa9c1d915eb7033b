//! Prediction engine: reads customer order histories and derives the next
//! expected order date for each customer.

use tracing::instrument;

use salesdate_sales::{NameFilter, Prediction, predict_all};

use crate::store::{SalesQuery, StoreError};

/// Read-only service over a [`SalesQuery`] store.
///
/// Every call reads fresh data; nothing is cached, so committed orders are
/// reflected immediately.
#[derive(Debug, Clone)]
pub struct PredictionEngine<Q> {
    store: Q,
}

impl<Q> PredictionEngine<Q>
where
    Q: SalesQuery,
{
    pub fn new(store: Q) -> Self {
        Self { store }
    }

    /// Predictions for every customer whose name contains `name_filter`
    /// (case-insensitive; absent or blank matches all), ordered by name.
    #[instrument(skip(self), err)]
    pub async fn compute_predictions(
        &self,
        name_filter: Option<&str>,
    ) -> Result<Vec<Prediction>, StoreError> {
        let filter = NameFilter::new(name_filter);
        let histories = self.store.customer_histories(&filter).await?;

        // Backend collations differ; case folding here is the reference.
        let predictions = predict_all(
            histories
                .into_iter()
                .filter(|h| filter.matches(&h.customer.name)),
        );
        tracing::debug!(count = predictions.len(), "computed predictions");
        Ok(predictions)
    }
}
