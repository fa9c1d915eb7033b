//! Infrastructure layer: relational store adapters, configuration, and the
//! services that compose them (prediction engine, order writer).

pub mod config;
pub mod order_writer;
pub mod prediction_engine;
pub mod store;


pub use config::{ConfigError, DatabaseConfig, StoreBackend, StoreConfig};
pub use order_writer::{OrderWriteError, OrderWriter};
pub use prediction_engine::PredictionEngine;
pub use store::{
    InMemorySalesStore, OrderTransaction, OrderUnitOfWork, PostgresSalesStore, SalesQuery,
    StoreError,
};
