use core::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use salesdate_core::{CustomerId, DomainError, DomainResult, EmployeeId, OrderId, ProductId, ShipperId};

/// Shipping destination printed on an order (free text).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipTo {
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
}

/// Order header as stored (one per order, owned by one customer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub employee_id: EmployeeId,
    pub shipper_id: ShipperId,
    pub order_date: Option<NaiveDate>,
    pub required_date: Option<NaiveDate>,
    /// `None` means "not yet shipped".
    pub shipped_date: Option<NaiveDate>,
    pub ship: ShipTo,
    /// Freight in smallest currency unit (e.g., cents).
    pub freight_cents: i64,
}

impl Order {
    /// Materialize a header once the store has assigned its identifier.
    pub fn from_header(id: OrderId, header: NewOrderHeader) -> Self {
        Self {
            id,
            customer_id: header.customer_id,
            employee_id: header.employee_id,
            shipper_id: header.shipper_id,
            order_date: header.order_date,
            required_date: header.required_date,
            shipped_date: header.shipped_date,
            ship: header.ship,
            freight_cents: header.freight_cents,
        }
    }

    /// Listing order: latest order date first, undated orders last, then
    /// newest identifier first.
    pub fn cmp_most_recent_first(a: &Order, b: &Order) -> Ordering {
        match (a.order_date, b.order_date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| b.id.cmp(&a.id))
    }
}

/// Order line: identity is `(order_id, product_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price_cents: i64,
    pub quantity: i32,
    /// Fraction, nominally 0.0..=1.0 (not enforced here).
    pub discount: f32,
}

impl OrderLine {
    pub fn from_new(order_id: OrderId, line: &NewOrderLine) -> Self {
        Self {
            order_id,
            product_id: line.product_id,
            unit_price_cents: line.unit_price_cents,
            quantity: line.quantity,
            discount: line.discount,
        }
    }
}

/// Command: CreateOrder (raw submission, possibly incomplete).
///
/// Required fields are optional here so that a missing value is reported as a
/// validation failure rather than a decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOrder {
    pub customer_id: Option<String>,
    pub employee_id: Option<EmployeeId>,
    pub shipper_id: Option<ShipperId>,
    pub ship_name: String,
    pub ship_address: String,
    pub ship_city: String,
    pub ship_country: String,
    pub order_date: Option<NaiveDate>,
    pub required_date: Option<NaiveDate>,
    pub shipped_date: Option<NaiveDate>,
    pub freight_cents: Option<i64>,

    pub product_id: Option<ProductId>,
    pub unit_price_cents: Option<i64>,
    pub quantity: Option<i32>,
    pub discount: f32,
}

/// Header half of a validated order, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderHeader {
    pub customer_id: CustomerId,
    pub employee_id: EmployeeId,
    pub shipper_id: ShipperId,
    pub order_date: Option<NaiveDate>,
    pub required_date: Option<NaiveDate>,
    pub shipped_date: Option<NaiveDate>,
    pub ship: ShipTo,
    pub freight_cents: i64,
}

/// Line half of a validated order, ready to insert once the header key exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub unit_price_cents: i64,
    pub quantity: i32,
    pub discount: f32,
}

/// A validated order submission: exactly one header and one line.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub header: NewOrderHeader,
    pub line: NewOrderLine,
}

impl CreateOrder {
    /// Validate the submission without touching any store.
    ///
    /// All violations are reported together in a single `Validation` error.
    pub fn validate(self) -> DomainResult<NewOrder> {
        let mut problems: Vec<&'static str> = Vec::new();

        let customer_id = match self.customer_id.as_deref().map(CustomerId::new) {
            Some(Ok(id)) => Some(id),
            _ => {
                problems.push("customer_id is required");
                None
            }
        };
        if self.employee_id.is_none() {
            problems.push("employee_id is required");
        }
        if self.shipper_id.is_none() {
            problems.push("shipper_id is required");
        }
        if self.product_id.is_none() {
            problems.push("product_id is required");
        }

        let freight_cents = self.freight_cents.unwrap_or(0);
        if freight_cents < 0 {
            problems.push("freight must not be negative");
        }

        match self.unit_price_cents {
            None => problems.push("unit_price is required"),
            Some(p) if p < 0 => problems.push("unit_price must not be negative"),
            Some(_) => {}
        }

        match self.quantity {
            None => problems.push("quantity is required"),
            Some(q) if q <= 0 => problems.push("quantity must be positive"),
            Some(_) => {}
        }

        match (
            customer_id,
            self.employee_id,
            self.shipper_id,
            self.product_id,
            self.unit_price_cents,
            self.quantity,
        ) {
            (
                Some(customer_id),
                Some(employee_id),
                Some(shipper_id),
                Some(product_id),
                Some(unit_price_cents),
                Some(quantity),
            ) if problems.is_empty() => Ok(NewOrder {
                header: NewOrderHeader {
                    customer_id,
                    employee_id,
                    shipper_id,
                    order_date: self.order_date,
                    required_date: self.required_date,
                    shipped_date: self.shipped_date,
                    ship: ShipTo {
                        name: self.ship_name,
                        address: self.ship_address,
                        city: self.ship_city,
                        country: self.ship_country,
                    },
                    freight_cents,
                },
                line: NewOrderLine {
                    product_id,
                    unit_price_cents,
                    quantity,
                    discount: self.discount,
                },
            }),
            _ => Err(DomainError::validation(problems.join("; "))),
        }
    }
}
