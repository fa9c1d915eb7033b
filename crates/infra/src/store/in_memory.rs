use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use salesdate_core::{CustomerId, OrderId, ProductId};
use salesdate_sales::{
    Customer, CustomerHistory, NameFilter, NewOrderHeader, NewOrderLine, Order, OrderLine,
};

use super::r#trait::{OrderTransaction, OrderUnitOfWork, SalesQuery, StoreError};

#[derive(Debug, Default)]
struct Tables {
    customers: BTreeMap<CustomerId, Customer>,
    orders: BTreeMap<OrderId, Order>,
    lines: BTreeMap<(OrderId, ProductId), OrderLine>,
}

#[derive(Debug)]
struct Shared {
    tables: RwLock<Tables>,
    next_order_id: AtomicI32,
    unavailable: AtomicBool,
    fail_next_line_insert: AtomicBool,
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_order_id: AtomicI32::new(1),
            unavailable: AtomicBool::new(false),
            fail_next_line_insert: AtomicBool::new(false),
            begun: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            rolled_back: AtomicU64::new(0),
        }
    }
}

impl Shared {
    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Connectivity("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

/// In-memory sales store.
///
/// Intended for tests/dev. Enforces the same referential rules as the
/// relational schema (known customer, line belongs to an existing order, one
/// line per product per order) and allocates order ids like an identity
/// column: an id handed out to a transaction that later rolls back is never
/// reused.
///
/// Cloning is cheap; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemorySalesStore {
    shared: Arc<Shared>,
}

impl InMemorySalesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customers(customers: impl IntoIterator<Item = Customer>) -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.shared.tables.write() {
            for customer in customers {
                tables.customers.insert(customer.id.clone(), customer);
            }
        }
        store
    }

    pub fn insert_customer(&self, customer: Customer) -> Result<(), StoreError> {
        let mut tables = self.shared.write()?;
        if tables.customers.contains_key(&customer.id) {
            return Err(StoreError::Constraint(format!(
                "customer {} already exists",
                customer.id
            )));
        }
        tables.customers.insert(customer.id.clone(), customer);
        Ok(())
    }

    /// Insert a committed order header directly (fixtures), bypassing
    /// transactions. Returns the allocated id.
    pub fn seed_order(&self, header: NewOrderHeader) -> Result<OrderId, StoreError> {
        let mut tables = self.shared.write()?;
        if !tables.customers.contains_key(&header.customer_id) {
            return Err(unknown_customer(&header.customer_id));
        }
        let id = OrderId::new(self.shared.next_order_id.fetch_add(1, Ordering::SeqCst));
        tables.orders.insert(id, Order::from_header(id, header));
        Ok(id)
    }

    /// Make every subsequent call fail with a connectivity error (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next line insert of any transaction with a backend error.
    pub fn fail_next_line_insert(&self) {
        self.shared.fail_next_line_insert.store(true, Ordering::SeqCst);
    }

    pub fn transactions_begun(&self) -> u64 {
        self.shared.begun.load(Ordering::SeqCst)
    }

    pub fn transactions_committed(&self) -> u64 {
        self.shared.committed.load(Ordering::SeqCst)
    }

    pub fn transactions_rolled_back(&self) -> u64 {
        self.shared.rolled_back.load(Ordering::SeqCst)
    }

    pub fn order_count(&self) -> usize {
        self.shared.read().map(|t| t.orders.len()).unwrap_or(0)
    }

    pub fn line_count(&self) -> usize {
        self.shared.read().map(|t| t.lines.len()).unwrap_or(0)
    }
}

fn unknown_customer(id: &CustomerId) -> StoreError {
    StoreError::Constraint(format!("customer {id} does not exist"))
}

#[async_trait]
impl SalesQuery for InMemorySalesStore {
    async fn customer_histories(
        &self,
        filter: &NameFilter,
    ) -> Result<Vec<CustomerHistory>, StoreError> {
        self.shared.ensure_available()?;
        let tables = self.shared.read()?;

        let mut dates: BTreeMap<&CustomerId, Vec<_>> = BTreeMap::new();
        for order in tables.orders.values() {
            if let Some(date) = order.order_date {
                dates.entry(&order.customer_id).or_default().push(date);
            }
        }

        Ok(tables
            .customers
            .values()
            .filter(|c| filter.matches(&c.name))
            .map(|c| {
                let order_dates = dates.remove(&c.id).unwrap_or_default();
                CustomerHistory::new(c.clone(), order_dates)
            })
            .collect())
    }

    async fn customer_orders(&self, customer_id: &CustomerId) -> Result<Vec<Order>, StoreError> {
        self.shared.ensure_available()?;
        let tables = self.shared.read()?;

        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| &o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(Order::cmp_most_recent_first);
        Ok(orders)
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError> {
        self.shared.ensure_available()?;
        let tables = self.shared.read()?;

        Ok(tables
            .lines
            .range((order_id, ProductId::new(i32::MIN))..=(order_id, ProductId::new(i32::MAX)))
            .map(|(_, line)| line.clone())
            .collect())
    }
}

#[async_trait]
impl OrderUnitOfWork for InMemorySalesStore {
    async fn begin(&self) -> Result<Box<dyn OrderTransaction>, StoreError> {
        self.shared.ensure_available()?;
        self.shared.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryOrderTransaction {
            shared: Arc::clone(&self.shared),
            orders: Vec::new(),
            lines: Vec::new(),
            finished: false,
        }))
    }
}

/// Transaction over [`InMemorySalesStore`].
///
/// Writes are staged locally and applied under a single write lock on commit,
/// so readers never observe a header without its line.
#[derive(Debug)]
pub struct InMemoryOrderTransaction {
    shared: Arc<Shared>,
    orders: Vec<Order>,
    lines: Vec<OrderLine>,
    finished: bool,
}

impl InMemoryOrderTransaction {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.finished {
            return Err(StoreError::Backend("transaction already finished".to_string()));
        }
        self.shared.ensure_available()
    }

    fn discard(&mut self) {
        self.orders.clear();
        self.lines.clear();
        self.finished = true;
        self.shared.rolled_back.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderTransaction for InMemoryOrderTransaction {
    async fn insert_header(&mut self, header: &NewOrderHeader) -> Result<OrderId, StoreError> {
        self.ensure_open()?;
        {
            let tables = self.shared.read()?;
            if !tables.customers.contains_key(&header.customer_id) {
                return Err(unknown_customer(&header.customer_id));
            }
        }

        let id = OrderId::new(self.shared.next_order_id.fetch_add(1, Ordering::SeqCst));
        self.orders.push(Order::from_header(id, header.clone()));
        Ok(id)
    }

    async fn insert_line(
        &mut self,
        order_id: OrderId,
        line: &NewOrderLine,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        if self.shared.fail_next_line_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected line insert failure".to_string()));
        }

        let staged_order = self.orders.iter().any(|o| o.id == order_id);
        let staged_dup = self
            .lines
            .iter()
            .any(|l| l.order_id == order_id && l.product_id == line.product_id);
        {
            let tables = self.shared.read()?;
            if !staged_order && !tables.orders.contains_key(&order_id) {
                return Err(StoreError::Constraint(format!("order {order_id} does not exist")));
            }
            if staged_dup || tables.lines.contains_key(&(order_id, line.product_id)) {
                return Err(StoreError::Constraint(format!(
                    "order {order_id} already has a line for product {}",
                    line.product_id
                )));
            }
        }

        self.lines.push(OrderLine::from_new(order_id, line));
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut tables = self.shared.write()?;

        for order in self.orders.drain(..) {
            tables.orders.insert(order.id, order);
        }
        for line in self.lines.drain(..) {
            tables.lines.insert((line.order_id, line.product_id), line);
        }
        drop(tables);

        self.finished = true;
        self.shared.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if self.finished {
            return Err(StoreError::Backend("transaction already finished".to_string()));
        }
        self.discard();
        Ok(())
    }
}

impl Drop for InMemoryOrderTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.discard();
        }
    }
}
