use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn predictions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PredictionQuery>,
) -> axum::response::Response {
    match services
        .predictions
        .compute_predictions(query.name_filter.as_deref())
        .await
    {
        Ok(predictions) => {
            let items = predictions
                .into_iter()
                .map(dto::prediction_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::Value::Array(items))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
