//! Postgres-backed sales store.
//!
//! Reads and writes the `sales` schema (`customers`, `orders`,
//! `order_details`). The schema itself is managed outside this crate.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (not-null / fk / unique / check) | `23502` `23503` `23505` `23514` | `Constraint` |
//! | Database (other) | Any other | `Backend` |
//! | PoolTimedOut | N/A | `Timeout` |
//! | PoolClosed / Io / Tls | N/A | `Connectivity` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Backend` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use salesdate_core::{CustomerId, EmployeeId, OrderId, ProductId, ShipperId};
use salesdate_sales::{
    Customer, CustomerHistory, NameFilter, NewOrderHeader, NewOrderLine, Order, OrderLine, ShipTo,
};

use super::r#trait::{OrderTransaction, OrderUnitOfWork, SalesQuery, StoreError};
use crate::config::DatabaseConfig;

/// Postgres-backed sales store.
///
/// `Send + Sync`; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct PostgresSalesStore {
    pool: Arc<PgPool>,
}

impl PostgresSalesStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Open a pool and verify that one connection can be established.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(Arc::new(pool)))
    }
}

#[derive(Debug)]
struct HistoryRow {
    customer_id: String,
    company_name: String,
    order_date: Option<NaiveDate>,
}

impl<'r> FromRow<'r, PgRow> for HistoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            customer_id: row.try_get("customer_id")?,
            company_name: row.try_get("company_name")?,
            order_date: row.try_get("order_date")?,
        })
    }
}

#[derive(Debug)]
struct OrderRow {
    order_id: i32,
    customer_id: String,
    employee_id: i32,
    shipper_id: i32,
    order_date: Option<NaiveDate>,
    required_date: Option<NaiveDate>,
    shipped_date: Option<NaiveDate>,
    ship_name: Option<String>,
    ship_address: Option<String>,
    ship_city: Option<String>,
    ship_country: Option<String>,
    freight_cents: i64,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            order_id: row.try_get("order_id")?,
            customer_id: row.try_get("customer_id")?,
            employee_id: row.try_get("employee_id")?,
            shipper_id: row.try_get("shipper_id")?,
            order_date: row.try_get("order_date")?,
            required_date: row.try_get("required_date")?,
            shipped_date: row.try_get("shipped_date")?,
            ship_name: row.try_get("ship_name")?,
            ship_address: row.try_get("ship_address")?,
            ship_city: row.try_get("ship_city")?,
            ship_country: row.try_get("ship_country")?,
            freight_cents: row.try_get("freight_cents")?,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::new(row.order_id),
            customer_id: parse_customer_id(row.customer_id)?,
            employee_id: EmployeeId::new(row.employee_id),
            shipper_id: ShipperId::new(row.shipper_id),
            order_date: row.order_date,
            required_date: row.required_date,
            shipped_date: row.shipped_date,
            ship: ShipTo {
                name: row.ship_name.unwrap_or_default(),
                address: row.ship_address.unwrap_or_default(),
                city: row.ship_city.unwrap_or_default(),
                country: row.ship_country.unwrap_or_default(),
            },
            freight_cents: row.freight_cents,
        })
    }
}

#[derive(Debug)]
struct OrderLineRow {
    order_id: i32,
    product_id: i32,
    unit_price_cents: i64,
    quantity: i32,
    discount: f32,
}

impl<'r> FromRow<'r, PgRow> for OrderLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            unit_price_cents: row.try_get("unit_price_cents")?,
            quantity: row.try_get("quantity")?,
            discount: row.try_get("discount")?,
        })
    }
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            unit_price_cents: row.unit_price_cents,
            quantity: row.quantity,
            discount: row.discount,
        }
    }
}

fn parse_customer_id(raw: String) -> Result<CustomerId, StoreError> {
    CustomerId::new(raw).map_err(|e| StoreError::Backend(format!("invalid customer_id in row: {e}")))
}

/// Escape `LIKE` metacharacters so the needle is matched literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// `ILIKE` pattern for a name filter, `None` when the filter accepts all.
fn name_pattern(filter: &NameFilter) -> Option<String> {
    filter.needle().map(|n| format!("%{}%", escape_like(n)))
}

/// Fold `(customer, order_date)` rows, ordered by customer, into histories.
fn group_histories(rows: Vec<HistoryRow>) -> Result<Vec<CustomerHistory>, StoreError> {
    let mut histories: Vec<CustomerHistory> = Vec::new();
    for row in rows {
        let same_customer = histories
            .last()
            .is_some_and(|h| h.customer.id.as_str() == row.customer_id.trim());
        if !same_customer {
            let customer = Customer::new(parse_customer_id(row.customer_id)?, row.company_name);
            histories.push(CustomerHistory::new(customer, Vec::new()));
        }
        if let (Some(date), Some(history)) = (row.order_date, histories.last_mut()) {
            history.order_dates.push(date);
        }
    }
    Ok(histories)
}

#[async_trait]
impl SalesQuery for PostgresSalesStore {
    #[instrument(skip(self, filter), fields(name_filter = ?filter.needle()), err)]
    async fn customer_histories(
        &self,
        filter: &NameFilter,
    ) -> Result<Vec<CustomerHistory>, StoreError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT c.customer_id, c.company_name, o.order_date
            FROM sales.customers c
            LEFT JOIN sales.orders o
              ON o.customer_id = c.customer_id
             AND o.order_date IS NOT NULL
            WHERE $1::text IS NULL OR c.company_name ILIKE $1 ESCAPE '\'
            ORDER BY c.customer_id, o.order_date
            "#,
        )
        .bind(name_pattern(filter))
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(|e| map_sqlx_error("customer_histories", e))?;

        group_histories(rows)
    }

    #[instrument(skip(self), fields(customer_id = %customer_id), err)]
    async fn customer_orders(&self, customer_id: &CustomerId) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT order_id, customer_id, employee_id, shipper_id,
                   order_date, required_date, shipped_date,
                   ship_name, ship_address, ship_city, ship_country, freight_cents
            FROM sales.orders
            WHERE customer_id = $1
            ORDER BY order_date DESC NULLS LAST, order_id DESC
            "#,
        )
        .bind(customer_id.as_str())
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(|e| map_sqlx_error("customer_orders", e))?;

        rows.into_iter().map(Order::try_from).collect()
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError> {
        let rows: Vec<OrderLineRow> = sqlx::query_as(
            r#"
            SELECT order_id, product_id, unit_price_cents, quantity, discount
            FROM sales.order_details
            WHERE order_id = $1
            ORDER BY product_id
            "#,
        )
        .bind(order_id.get())
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(|e| map_sqlx_error("order_lines", e))?;

        Ok(rows.into_iter().map(OrderLine::from).collect())
    }
}

#[async_trait]
impl OrderUnitOfWork for PostgresSalesStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PostgresOrderTransaction { tx: Some(tx) }))
    }
}

/// An open Postgres transaction.
///
/// sqlx rolls back a transaction that is dropped without being finished.
pub struct PostgresOrderTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl std::fmt::Debug for PostgresOrderTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresOrderTransaction")
            .field("open", &self.tx.is_some())
            .finish()
    }
}

impl PostgresOrderTransaction {
    fn open(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::Backend("transaction already finished".to_string()))
    }

    fn take(&mut self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.tx
            .take()
            .ok_or_else(|| StoreError::Backend("transaction already finished".to_string()))
    }
}

#[async_trait]
impl OrderTransaction for PostgresOrderTransaction {
    #[instrument(skip(self, header), fields(customer_id = %header.customer_id), err)]
    async fn insert_header(&mut self, header: &NewOrderHeader) -> Result<OrderId, StoreError> {
        let tx = self.open()?;
        let row = sqlx::query(
            r#"
            INSERT INTO sales.orders (
                customer_id, employee_id, shipper_id,
                order_date, required_date, shipped_date,
                ship_name, ship_address, ship_city, ship_country, freight_cents
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING order_id
            "#,
        )
        .bind(header.customer_id.as_str())
        .bind(header.employee_id.get())
        .bind(header.shipper_id.get())
        .bind(header.order_date)
        .bind(header.required_date)
        .bind(header.shipped_date)
        .bind(header.ship.name.as_str())
        .bind(header.ship.address.as_str())
        .bind(header.ship.city.as_str())
        .bind(header.ship.country.as_str())
        .bind(header.freight_cents)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_header", e))?;

        let id: i32 = row
            .try_get("order_id")
            .map_err(|e| map_sqlx_error("insert_header", e))?;
        Ok(OrderId::new(id))
    }

    #[instrument(skip(self, line), fields(order_id = %order_id, product_id = %line.product_id), err)]
    async fn insert_line(
        &mut self,
        order_id: OrderId,
        line: &NewOrderLine,
    ) -> Result<(), StoreError> {
        let tx = self.open()?;
        sqlx::query(
            r#"
            INSERT INTO sales.order_details (order_id, product_id, unit_price_cents, quantity, discount)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id.get())
        .bind(line.product_id.get())
        .bind(line.unit_price_cents)
        .bind(line.quantity)
        .bind(line.discount)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_line", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn commit(&mut self) -> Result<(), StoreError> {
        self.take()?
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }

    #[instrument(skip(self), err)]
    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.take()?
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                // not_null_violation, foreign_key_violation, unique_violation, check_violation
                Some("23502" | "23503" | "23505" | "23514") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Timeout(format!("timed out acquiring a connection in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Connectivity(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Connectivity(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => StoreError::Connectivity(format!("tls error in {operation}: {e}")),
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row not found in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
