//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the two core services
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::http::{Method, header};
use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// The store backend is chosen from the environment (see
/// [`salesdate_infra::StoreConfig`]).
pub async fn build_app(config: &ServerConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services().await?);
    Ok(router(services, config))
}

/// Router over already-built services.
pub fn router(services: Arc<services::AppServices>, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(config.cors_allowed_origin.clone())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
