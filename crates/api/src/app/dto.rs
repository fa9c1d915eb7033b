use serde::Deserialize;

use salesdate_sales::{Order, OrderLine, Prediction};

// -------------------------
// Request DTOs
// -------------------------

/// Query string of `GET /customers/predictions`.
#[derive(Debug, Default, Deserialize)]
pub struct PredictionQuery {
    #[serde(alias = "nameFilter")]
    pub name_filter: Option<String>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn prediction_to_json(p: Prediction) -> serde_json::Value {
    serde_json::json!({
        "customer_id": p.customer_id.as_str(),
        "customer_name": p.customer_name,
        "last_order_date": p.last_order_date,
        "next_predicted_order": p.next_predicted_order,
    })
}

pub fn order_line_to_json(line: OrderLine) -> serde_json::Value {
    serde_json::json!({
        "product_id": line.product_id.get(),
        "unit_price_cents": line.unit_price_cents,
        "quantity": line.quantity,
        "discount": line.discount,
    })
}

pub fn order_to_json(order: Order, lines: Vec<OrderLine>) -> serde_json::Value {
    serde_json::json!({
        "order_id": order.id.get(),
        "customer_id": order.customer_id.as_str(),
        "employee_id": order.employee_id.get(),
        "shipper_id": order.shipper_id.get(),
        "order_date": order.order_date,
        "required_date": order.required_date,
        "shipped_date": order.shipped_date,
        "ship_name": order.ship.name,
        "ship_address": order.ship.address,
        "ship_city": order.ship.city,
        "ship_country": order.ship.country,
        "freight_cents": order.freight_cents,
        "lines": lines.into_iter().map(order_line_to_json).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use salesdate_core::CustomerId;

    use super::*;

    #[test]
    fn prediction_json_uses_iso_dates_and_nulls() {
        let json = prediction_to_json(Prediction {
            customer_id: CustomerId::new("ALFKI").unwrap(),
            customer_name: "Alfreds Futterkiste".to_string(),
            last_order_date: NaiveDate::from_ymd_opt(2024, 1, 21),
            next_predicted_order: None,
        });

        assert_eq!(json["customer_id"], "ALFKI");
        assert_eq!(json["last_order_date"], "2024-01-21");
        assert!(json["next_predicted_order"].is_null());
    }

    #[test]
    fn query_accepts_both_spellings() {
        let q: PredictionQuery = serde_json::from_str(r#"{"nameFilter": "ohn"}"#).unwrap();
        assert_eq!(q.name_filter.as_deref(), Some("ohn"));
        let q: PredictionQuery = serde_json::from_str(r#"{"name_filter": "ohn"}"#).unwrap();
        assert_eq!(q.name_filter.as_deref(), Some("ohn"));
    }
}
