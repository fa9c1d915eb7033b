use axum::{Router, routing::get, routing::post};

pub mod customers;
pub mod orders;
pub mod system;

/// Router for all API endpoints except `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/customers/predictions", get(customers::predictions))
        .route("/orders", post(orders::create_order))
        .route("/orders/customer/:customer_id", get(orders::customer_orders))
}
