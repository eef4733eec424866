use axum::Router;

pub mod accounts;
pub mod customers;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .merge(customers::router())
        .nest("/customers", accounts::router())
}
