//! Order writer: validates a submission and persists its header and line in a
//! single transaction.
//!
//! ```text
//! CreateOrder
//!   ↓
//! 1. Validate (no store access)
//!   ↓
//! 2. Begin transaction
//!   ↓
//! 3. Insert header → generated OrderId
//!   ↓
//! 4. Insert line keyed by that OrderId
//!   ↓
//! 5. Commit (or roll back on any failure in 3-4)
//! ```

use thiserror::Error;
use tracing::instrument;

use salesdate_core::{DomainError, OrderId};
use salesdate_sales::{CreateOrder, NewOrder};

use crate::store::{OrderTransaction, OrderUnitOfWork, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderWriteError {
    /// The submission is structurally invalid; nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The store rejected or failed the write; nothing was committed.
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl From<DomainError> for OrderWriteError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                OrderWriteError::Validation(msg)
            }
            DomainError::NotFound => {
                OrderWriteError::Persistence(StoreError::NotFound("referenced row".to_string()))
            }
        }
    }
}

/// Write service over an [`OrderUnitOfWork`] store.
///
/// Not idempotent: submitting the same request twice creates two orders.
#[derive(Debug, Clone)]
pub struct OrderWriter<W> {
    store: W,
}

impl<W> OrderWriter<W>
where
    W: OrderUnitOfWork,
{
    pub fn new(store: W) -> Self {
        Self { store }
    }

    /// Validate and persist one order with exactly one line.
    ///
    /// Either both rows are committed and the generated id is returned, or
    /// neither is visible afterwards.
    #[instrument(skip(self, request), fields(customer_id = ?request.customer_id), err)]
    pub async fn create_order(&self, request: CreateOrder) -> Result<OrderId, OrderWriteError> {
        let order = request.validate()?;

        let mut tx = self.store.begin().await?;
        match write_rows(tx.as_mut(), &order).await {
            Ok(order_id) => {
                tx.commit().await?;
                tracing::info!(
                    order_id = %order_id,
                    customer_id = %order.header.customer_id,
                    product_id = %order.line.product_id,
                    "order created"
                );
                Ok(order_id)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback after failed order write also failed");
                }
                Err(err.into())
            }
        }
    }
}

async fn write_rows(tx: &mut dyn OrderTransaction, order: &NewOrder) -> Result<OrderId, StoreError> {
    let order_id = tx.insert_header(&order.header).await?;
    tx.insert_line(order_id, &order.line).await?;
    Ok(order_id)
}
