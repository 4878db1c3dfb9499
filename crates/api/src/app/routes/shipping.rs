use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/shipping", get(list_shipping))
}

/// Every shipping line across all orders, newest first.
pub async fn list_shipping(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.orders.list_shipping().await {
        Ok(lines) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": lines.iter().map(dto::shipping_line_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
