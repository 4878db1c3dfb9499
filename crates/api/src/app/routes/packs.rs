use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/packs", get(list_packs))
}

pub async fn list_packs(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.orders.pack_sizes().await {
        Ok(sizes) => (StatusCode::OK, Json(dto::pack_sizes_to_json(&sizes))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
