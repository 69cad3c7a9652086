//! HTTP application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: infrastructure wiring (stores, audit pipeline, token
//!   verifier, decorated repositories)
//! - `routes/`: HTTP routes + handlers (one file per surface area)
//! - `dto.rs`: request/response DTOs and the response envelope
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use remitdesk_auth::TokenVerifier;
use remitdesk_infra::PermissionResolver;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests). Returns the services alongside so the caller can
/// drain the audit writer at shutdown.
pub async fn build_app(jwt_secret: String) -> (Router, Arc<AppServices>) {
    let services = Arc::new(services::build_services(jwt_secret).await);

    let scope_state = middleware::ScopeState {
        contexts: services.contexts.clone(),
    };
    let session_state = middleware::SessionState {
        verifier: services.verifier.clone() as Arc<dyn TokenVerifier>,
        resolver: services.rbac.clone() as Arc<dyn PermissionResolver>,
        contexts: services.contexts.clone(),
    };

    // Request-scope runs outermost so every response (public paths and
    // authentication failures included) carries the request id header.
    let router = routes::router()
        .layer(Extension(services.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    scope_state,
                    middleware::request_scope_middleware,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    session_state,
                    middleware::session_middleware,
                )),
        );

    (router, services)
}
