//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend wiring (store selection, catalog seeding)
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>, config: &ApiConfig) -> Router {
    let mut app = routes::router().layer(Extension(services));

    if let Some(cors) = cors_layer(config.frontend_url.as_deref()) {
        app = app.layer(cors);
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

pub use services::AppServices;

/// CORS for the configured frontend origin; `None` when no (valid) origin is set.
fn cors_layer(frontend_url: Option<&str>) -> Option<CorsLayer> {
    let origin = frontend_url?;
    let origin = match HeaderValue::from_str(origin.trim_end_matches('/')) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(origin, error = %e, "ignoring invalid frontend origin");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
    )
}
