//! Sales domain module: customers, orders and next-order-date prediction.
//!
//! This crate contains business rules only, implemented as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod customer;
pub mod order;
pub mod prediction;

pub use customer::{Customer, NameFilter};
pub use order::{CreateOrder, NewOrder, NewOrderHeader, NewOrderLine, Order, OrderLine, ShipTo};
pub use prediction::{
    CustomerHistory, DEFAULT_GAP_DAYS, GapStats, Prediction, average_gap_days, predict,
    predict_all,
};
