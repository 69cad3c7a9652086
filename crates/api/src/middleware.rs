//! Request-scope and session-resolution middleware.
//!
//! Two layers run on every request, outermost first:
//!
//! 1. [`request_scope_middleware`] generates a fresh request id, seeds the
//!    request-context store (ip, user agent), exposes the id to handlers as
//!    a [`RequestScope`] extension, echoes it in the `x-request-id` response
//!    header, and deletes any leftover store entry once the response is
//!    built.
//! 2. [`session_middleware`] resolves the principal: pre-flight probes and
//!    public paths pass through unauthenticated; everything else needs a
//!    valid bearer credential plus a permission-set lookup.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use remitdesk_audit::{RequestContext, RequestContextStore, RequestScope};
use remitdesk_auth::{AccountStatus, Principal, TokenVerifier};
use remitdesk_core::RequestId;
use remitdesk_infra::PermissionResolver;

use crate::app::errors;

/// Path markers that never require a credential.
pub const PUBLIC_PATH_MARKERS: &[&str] = &["/login", "/register", "/health", "/seed"];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATH_MARKERS.iter().any(|m| path.contains(m))
}

/// Response header carrying the generated request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct ScopeState {
    pub contexts: Arc<RequestContextStore>,
}

pub async fn request_scope_middleware(
    State(state): State<ScopeState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let request_id = RequestId::new();

    state.contexts.seed(
        request_id,
        RequestContext {
            ip_address: client_ip(req.headers()),
            request_id: Some(request_id),
            user_agent: header_str(req.headers(), header::USER_AGENT.as_str()),
            ..RequestContext::default()
        },
    );
    req.extensions_mut()
        .insert(RequestScope::for_request(request_id));

    let mut res = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    // Single-use consumption by the audit layer normally empties the entry;
    // this covers requests that never mutated anything, and the sweep
    // covers requests that never completed.
    state.contexts.remove(request_id);
    state.contexts.evict_expired();

    res
}

#[derive(Clone)]
pub struct SessionState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub resolver: Arc<dyn PermissionResolver>,
    pub contexts: Arc<RequestContextStore>,
}

pub async fn session_middleware(
    State(state): State<SessionState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    // CORS pre-flight probes carry no credentials by design.
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let token = match extract_bearer(req.headers()) {
        Ok(token) => token,
        Err(message) => return errors::authentication_error(message),
    };

    let claims = match state.verifier.verify(token) {
        Ok(claims) => claims,
        Err(_) => return errors::authentication_error("invalid or expired credential"),
    };

    if claims.status == AccountStatus::Suspended {
        return errors::authentication_error("account is suspended");
    }

    // Role -> RolePermission -> Permission. A role that no longer resolves
    // degrades to the empty set: the caller stays authenticated but can
    // pass no permission gate. Storage failures degrade the same way.
    let permissions = match state.resolver.permissions_for_role(claims.role_id).await {
        Ok(permissions) => permissions,
        Err(e) => {
            warn!(role_id = %claims.role_id, error = %e, "permission resolution failed; treating as empty");
            Default::default()
        }
    };

    if let Some(request_id) = req
        .extensions()
        .get::<RequestScope>()
        .and_then(|scope| scope.request_id)
    {
        state
            .contexts
            .stamp_actor(request_id, claims.sub, claims.organisation_id);
    }

    req.extensions_mut()
        .insert(Principal::from_claims(claims, permissions));

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or("missing Authorization header")?;

    let header = header.to_str().map_err(|_| "malformed Authorization header")?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must use the Bearer scheme")?
        .trim();

    if token.is_empty() {
        return Err("empty bearer token");
    }

    Ok(token)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .map(|raw| raw.split(',').next().unwrap_or(&raw).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_path_markers_match_anywhere_in_the_path() {
        assert!(is_public_path("/auth/login"));
        assert!(is_public_path("/api/v2/auth/register"));
        assert!(is_public_path("/health"));
        assert!(is_public_path("/seed"));
        assert!(!is_public_path("/transactions"));
        assert!(!is_public_path("/audit/records"));
    }

    #[test]
    fn bearer_extraction_rejects_malformed_headers() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(extract_bearer(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(extract_bearer(&headers).unwrap(), "tok");
    }

    #[test]
    fn first_forwarded_address_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.9"));
    }
}
