use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use packship_infra::OrderServiceError;
use packship_packing::SolveError;

pub fn service_error_to_response(err: OrderServiceError) -> axum::response::Response {
    match err {
        OrderServiceError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        OrderServiceError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("order {id} not found"))
        }
        OrderServiceError::NoPacksAvailable => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "no_packs_available",
            "no packs to ship",
        ),
        OrderServiceError::Solve(e @ SolveError::HorizonOverflow { .. }) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        OrderServiceError::Solve(e) if e.is_invalid_input() => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        OrderServiceError::Solve(e) => {
            tracing::error!(error = %e, "pack selection failed");
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "no_feasible_assignment", e.to_string())
        }
        OrderServiceError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        OrderServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        OrderServiceError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
        }
        OrderServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "internal storage error",
            )
        }
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
