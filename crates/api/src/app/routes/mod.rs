use axum::Router;

pub mod orders;
pub mod packs;
pub mod shipping;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .merge(system::router())
        .merge(orders::router())
        .merge(shipping::router())
        .merge(packs::router())
}
