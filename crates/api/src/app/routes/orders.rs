use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};

use salesdate_core::CustomerId;
use salesdate_infra::SalesQuery;
use salesdate_sales::CreateOrder;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CreateOrder>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text());
        }
    };

    let customer_id = request
        .customer_id
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    match services.orders.create_order(request).await {
        Ok(order_id) => (
            StatusCode::CREATED,
            [(header::LOCATION, format!("/orders/customer/{customer_id}"))],
            Json(serde_json::json!({ "order_id": order_id.get() })),
        )
            .into_response(),
        Err(e) => errors::order_write_error_to_response(e),
    }
}

pub async fn customer_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Path(customer_id): Path<String>,
) -> axum::response::Response {
    let customer_id = match CustomerId::new(customer_id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let orders = match services.query.customer_orders(&customer_id).await {
        Ok(orders) => orders,
        Err(e) => return errors::store_error_to_response(e),
    };

    let mut items = Vec::with_capacity(orders.len());
    for order in orders {
        let lines = match services.query.order_lines(order.id).await {
            Ok(lines) => lines,
            Err(e) => return errors::store_error_to_response(e),
        };
        items.push(dto::order_to_json(order, lines));
    }

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
