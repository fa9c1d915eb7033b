use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use salesdate_core::DomainError;
use salesdate_infra::{OrderWriteError, StoreError};

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match &err {
        StoreError::Constraint(_) => json_error(StatusCode::CONFLICT, "constraint_violation", err.to_string()),
        StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        StoreError::Connectivity(_) | StoreError::Timeout(_) => {
            tracing::warn!(error = %err, "store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", err.to_string())
        }
        StoreError::Backend(_) => {
            tracing::error!(error = %err, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal store error")
        }
    }
}

pub fn order_write_error_to_response(err: OrderWriteError) -> axum::response::Response {
    match err {
        OrderWriteError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        OrderWriteError::Persistence(e) => store_error_to_response(e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
