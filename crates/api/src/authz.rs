//! Route-level authorization guard.
//!
//! Each route declares the permission it requires and the message returned
//! on denial. Enforcement happens before any handler logic runs.

use axum::response::Response;

use remitdesk_auth::{authorize, Permission, Principal};

use crate::app::errors;

/// Check the route's required permission against the resolved principal.
///
/// Returns the ready-to-send 403 response on denial so handlers can
/// early-return with `?`-like brevity.
pub fn require(
    principal: &Principal,
    required: &Permission,
    denial_message: &'static str,
) -> Result<(), Response> {
    authorize(principal, required, denial_message)
        .map_err(|e| errors::authorization_error(&e.to_string()))
}
