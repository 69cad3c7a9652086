use thiserror::Error;

use crate::permissions::Permission;
use crate::principal::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// Carries the route-supplied explanation, surfaced verbatim to the caller.
    #[error("{0}")]
    Forbidden(String),
}

/// Authorize a principal against a route's required permission.
///
/// - No IO
/// - No panics
/// - Exact string equality only: "admin.roles.create" does not satisfy
///   "admin.roles.delete", and there is no prefix or wildcard matching.
pub fn authorize(
    principal: &Principal,
    required: &Permission,
    denial_message: &str,
) -> Result<(), AuthzError> {
    if principal.has_permission(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(denial_message.to_string()))
    }
}
