//! Relational store boundary.
//!
//! The services in this crate see the store only through two narrow
//! capabilities: a read capability ([`SalesQuery`]) and a transactional write
//! capability ([`OrderUnitOfWork`] / [`OrderTransaction`]).

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryOrderTransaction, InMemorySalesStore};
pub use postgres::{PostgresOrderTransaction, PostgresSalesStore};
pub use r#trait::{OrderTransaction, OrderUnitOfWork, SalesQuery, StoreError};
