//! HTTP routes, one file per surface area.

use axum::Router;

pub mod audit;
pub mod auth;
pub mod roles;
pub mod seed;
pub mod system;
pub mod transactions;

pub fn router() -> Router {
    Router::new()
        .merge(system::router())
        .merge(seed::router())
        .merge(auth::router())
        .merge(roles::router())
        .merge(transactions::router())
        .merge(audit::router())
}
