use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::json;

use salesdate_api::app::{self, services::AppServices};
use salesdate_api::config::ServerConfig;
use salesdate_core::{CustomerId, EmployeeId, ShipperId};
use salesdate_infra::InMemorySalesStore;
use salesdate_sales::{Customer, NewOrderHeader, ShipTo};

struct TestServer {
    base_url: String,
    store: InMemorySalesStore,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod over a seeded in-memory store, on an ephemeral port.
    async fn spawn() -> Self {
        let store = InMemorySalesStore::with_customers([
            Customer::new(CustomerId::new("ALFKI").unwrap(), "Alfreds Futterkiste"),
            Customer::new(CustomerId::new("JOHNS").unwrap(), "Johnson Traders"),
            Customer::new(CustomerId::new("BLONP").unwrap(), "Blondel père et fils"),
        ]);
        for day in [1, 11, 21] {
            store
                .seed_order(header("ALFKI", NaiveDate::from_ymd_opt(2024, 1, day)))
                .unwrap();
        }

        let services = Arc::new(AppServices::from_store(Arc::new(store.clone())));
        let app = app::router(services, &ServerConfig::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn header(customer: &str, order_date: Option<NaiveDate>) -> NewOrderHeader {
    NewOrderHeader {
        customer_id: CustomerId::new(customer).unwrap(),
        employee_id: EmployeeId::new(1),
        shipper_id: ShipperId::new(1),
        order_date,
        required_date: None,
        shipped_date: None,
        ship: ShipTo::default(),
        freight_cents: 0,
    }
}

fn order_body(customer_id: &str) -> serde_json::Value {
    json!({
        "customer_id": customer_id,
        "employee_id": 5,
        "shipper_id": 3,
        "ship_name": "Johnson Traders",
        "ship_address": "12 Harbour Rd",
        "ship_city": "Leeds",
        "ship_country": "UK",
        "order_date": "2024-03-01",
        "required_date": "2024-03-08",
        "freight_cents": 1250,
        "product_id": 42,
        "unit_price_cents": 1899,
        "quantity": 4,
        "discount": 0.1
    })
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn predictions_are_sorted_by_name_and_filterable() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/customers/predictions", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let items = body.as_array().unwrap();
    let names: Vec<&str> = items.iter().map(|p| p["customer_name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Alfreds Futterkiste", "Blondel père et fils", "Johnson Traders"]);

    assert_eq!(items[0]["last_order_date"], "2024-01-21");
    assert_eq!(items[0]["next_predicted_order"], "2024-02-03");
    assert!(items[2]["last_order_date"].is_null());
    assert!(items[2]["next_predicted_order"].is_null());

    for param in ["name_filter", "nameFilter"] {
        let res = client
            .get(format!("{}/customers/predictions?{param}=OHN", srv.base_url))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = res.json().await.unwrap();
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["customer_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["JOHNS"]);
    }
}

#[tokio::test]
async fn create_order_returns_id_and_location() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .json(&order_body("JOHNS"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(
        res.headers()[reqwest::header::LOCATION],
        "/orders/customer/JOHNS"
    );
    let body: serde_json::Value = res.json().await.unwrap();
    let order_id = body["order_id"].as_i64().unwrap();
    assert!(order_id > 0);

    let res = client
        .get(format!("{}/orders/customer/JOHNS", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["order_id"].as_i64().unwrap(), order_id);
    assert_eq!(items[0]["ship_city"], "Leeds");
    assert_eq!(items[0]["lines"][0]["product_id"], 42);
    assert_eq!(items[0]["lines"][0]["quantity"], 4);

    // The new order is reflected by the next prediction.
    let res = client
        .get(format!("{}/customers/predictions?name_filter=johnson", srv.base_url))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body[0]["last_order_date"], "2024-03-01");
    assert_eq!(body[0]["next_predicted_order"], "2024-03-31");
}

#[tokio::test]
async fn invalid_order_is_rejected_without_writes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let orders_before = srv.store.order_count();

    let mut body = order_body("JOHNS");
    body["customer_id"] = json!("   ");
    body["quantity"] = json!(0);

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "validation_error");
    let message = err["message"].as_str().unwrap();
    assert!(message.contains("customer_id"));
    assert!(message.contains("quantity"));

    assert_eq!(srv.store.transactions_begun(), 0);
    assert_eq!(srv.store.order_count(), orders_before);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(r#"{"customer_id": "JOHNS", "quantity": "many"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "invalid_body");
}

#[tokio::test]
async fn unknown_customer_is_a_conflict() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .json(&order_body("NOONE"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "constraint_violation");
    assert_eq!(srv.store.transactions_committed(), 0);
}

#[tokio::test]
async fn forced_line_failure_leaves_no_header() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    srv.store.fail_next_line_insert();

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .json(&order_body("JOHNS"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let res = client
        .get(format!("{}/orders/customer/JOHNS", srv.base_url))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn store_outage_is_service_unavailable() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    srv.store.set_unavailable(true);

    let res = client
        .get(format!("{}/customers/predictions", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .json(&order_body("JOHNS"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "store_unavailable");
}

#[tokio::test]
async fn customer_orders_are_most_recent_first() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/orders/customer/ALFKI", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let dates: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["order_date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-01-21", "2024-01-11", "2024-01-01"]);

    let res = client
        .get(format!("{}/orders/customer/%20", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cors_allows_the_configured_origin() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/customers/predictions", srv.base_url))
        .header(reqwest::header::ORIGIN, "http://localhost:4200")
        .send()
        .await
        .unwrap();
    assert_eq!(
        res.headers()[reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:4200"
    );
}
