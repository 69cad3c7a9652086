//! Login, registration, and profile.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use remitdesk_audit::{Repository, RequestScope};
use remitdesk_auth::{verify_password, AccountStatus, Principal, User};

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/profile", get(profile))
}

fn user_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "organisation_id": user.organisation_id,
        "email": user.email,
        "display_name": user.display_name,
        "role_id": user.role_id,
        "status": user.status,
    })
}

/// POST /auth/login - public; exchanges credentials for a bearer token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<dto::LoginRequest>,
) -> axum::response::Response {
    // One failure message for every branch: callers learn nothing about
    // which part was wrong.
    const FAILED: &str = "invalid email or password";

    let Some(user) = services.users.inner().find_by_email(&req.email) else {
        return errors::authentication_error(FAILED);
    };
    if !verify_password(&req.password, &user.password_hash) {
        return errors::authentication_error(FAILED);
    }
    if user.status == AccountStatus::Suspended {
        return errors::authentication_error("account is suspended");
    }

    let token = match services.verifier.issue(
        user.id,
        user.email.clone(),
        user.role_id,
        user.organisation_id,
        user.status,
    ) {
        Ok(token) => token,
        Err(_) => {
            return errors::domain_error_to_response(remitdesk_core::DomainError::internal(
                "token issuance failed",
            ));
        }
    };

    dto::ok(
        "logged in",
        json!({ "token": token, "user": user_json(&user) }),
    )
}

/// POST /auth/register - public; creates a user under an existing role.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Json(req): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    // The role must already exist; registration cannot mint permissions.
    match services.roles.get(&req.role_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::validation_error("role_id does not reference a known role"),
        Err(e) => return errors::domain_error_to_response(e),
    }

    let user = match User::new(
        req.organisation_id,
        req.email,
        req.display_name,
        &req.password,
        req.role_id,
    ) {
        Ok(user) => user,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.users.insert(scope, user).await {
        Ok(user) => dto::created("user registered", json!({ "user": user_json(&user) })),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// GET /auth/profile - authenticated, no permission required.
///
/// A principal whose role has vanished still lands here successfully, with
/// an empty permission list.
pub async fn profile(Extension(principal): Extension<Principal>) -> axum::response::Response {
    let mut permissions: Vec<&str> = principal
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();
    permissions.sort_unstable();

    dto::ok(
        "profile",
        json!({
            "user_id": principal.user_id,
            "email": principal.email,
            "role_id": principal.role_id,
            "organisation_id": principal.organisation_id,
            "status": principal.status,
            "permissions": permissions,
        }),
    )
}
