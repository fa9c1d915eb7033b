use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use salesdate_core::{CustomerId, OrderId};
use salesdate_sales::{CustomerHistory, NameFilter, NewOrderHeader, NewOrderLine, Order, OrderLine};

/// Store operation error.
///
/// These are **infrastructure errors** as opposed to domain errors
/// (validation). Callers that care about retrying can ask
/// [`StoreError::is_transient`]; nothing in this crate retries.
///
/// ## Error Categories
///
/// - **Constraint**: the store rejected the data (foreign key, unique, check, not-null)
/// - **NotFound**: a row the operation relied on does not exist
/// - **Connectivity**: the store could not be reached (pool closed, IO, TLS)
/// - **Timeout**: no connection became available in time
/// - **Backend**: anything else the store reported
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Connectivity(String),

    #[error("store timed out: {0}")]
    Timeout(String),

    #[error("store failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the failure is about reaching the store rather than the data.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Connectivity(_) | StoreError::Timeout(_))
    }
}

/// Read capability over customers, orders and order lines.
///
/// Implementations must reflect committed writes immediately (no caching) and
/// must never expose rows of an uncommitted transaction.
#[async_trait]
pub trait SalesQuery: Send + Sync {
    /// Customers whose name matches `filter`, each with the order dates of its
    /// own orders. Customers without orders are included with no dates;
    /// orders without an order date contribute nothing.
    async fn customer_histories(&self, filter: &NameFilter)
    -> Result<Vec<CustomerHistory>, StoreError>;

    /// Orders of one customer, most recent order date first.
    async fn customer_orders(&self, customer_id: &CustomerId) -> Result<Vec<Order>, StoreError>;

    /// Lines of one order.
    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError>;
}

/// Transactional write capability: hands out one transaction per unit of work.
#[async_trait]
pub trait OrderUnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, StoreError>;
}

/// A single open transaction.
///
/// Dropping a transaction that was neither committed nor rolled back discards
/// its writes.
#[async_trait]
pub trait OrderTransaction: Send {
    /// Insert an order header and return the store-generated identifier.
    async fn insert_header(&mut self, header: &NewOrderHeader) -> Result<OrderId, StoreError>;

    /// Insert a line for an order inserted earlier in this transaction.
    async fn insert_line(&mut self, order_id: OrderId, line: &NewOrderLine)
    -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> SalesQuery for Arc<S>
where
    S: SalesQuery + ?Sized,
{
    async fn customer_histories(
        &self,
        filter: &NameFilter,
    ) -> Result<Vec<CustomerHistory>, StoreError> {
        (**self).customer_histories(filter).await
    }

    async fn customer_orders(&self, customer_id: &CustomerId) -> Result<Vec<Order>, StoreError> {
        (**self).customer_orders(customer_id).await
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError> {
        (**self).order_lines(order_id).await
    }
}

#[async_trait]
impl<S> OrderUnitOfWork for Arc<S>
where
    S: OrderUnitOfWork + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, StoreError> {
        (**self).begin().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connectivity_and_timeouts_are_transient() {
        assert!(StoreError::Connectivity("pool closed".into()).is_transient());
        assert!(StoreError::Timeout("acquire".into()).is_transient());
        assert!(!StoreError::Constraint("fk".into()).is_transient());
        assert!(!StoreError::NotFound("order".into()).is_transient());
        assert!(!StoreError::Backend("syntax".into()).is_transient());
    }
}
