//! Dev/bootstrap seeding: organisation, baseline roles, admin user.

use std::sync::Arc;

use axum::{extract::Extension, routing::post, Json, Router};
use serde_json::json;
use tracing::warn;

use remitdesk_audit::{Repository, RequestScope};
use remitdesk_auth::{Role, RolePermission, User, REGISTRY};
use remitdesk_core::{DomainResult, OrganisationId, RoleId};

use crate::app::{dto, errors, services::AppServices};

const DEFAULT_ADMIN_EMAIL: &str = "admin@remitdesk.local";
const DEFAULT_ADMIN_PASSWORD: &str = "change-me-now";

const TELLER_PERMISSIONS: &[&str] = &[
    "transactions.read",
    "transactions.create",
    "transactions.edit",
    "transactions.mark_ready",
    "transactions.cancel",
];

pub fn router() -> Router {
    Router::new().route("/seed", post(seed))
}

async fn grant_all(
    services: &AppServices,
    scope: RequestScope,
    role_id: RoleId,
    names: &[&str],
) -> DomainResult<()> {
    let grants: Vec<RolePermission> = names
        .iter()
        .filter_map(|name| services.rbac.find_permission(name))
        .map(|entry| RolePermission::new(role_id, entry.id, None))
        .collect();
    services.grants.insert_many(scope, grants).await?;
    Ok(())
}

/// POST /seed - public bootstrap; idempotent.
///
/// Creates an organisation, an `admin` role holding every registry
/// permission, a `teller` role with the day-to-day subset, and the admin
/// user. Subsequent calls return the already-seeded marker.
pub async fn seed(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Json(req): Json<dto::SeedRequest>,
) -> axum::response::Response {
    let admin_email = req
        .admin_email
        .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string());
    let admin_password = req.admin_password.unwrap_or_else(|| {
        warn!("seeding with the default admin password; change it immediately");
        DEFAULT_ADMIN_PASSWORD.to_string()
    });

    if let Some(existing) = services.users.inner().find_by_email(&admin_email) {
        return dto::ok(
            "already seeded",
            json!({
                "organisation_id": existing.organisation_id,
                "admin_email": existing.email,
            }),
        );
    }

    let organisation_id = OrganisationId::new();

    let admin_role = match services.roles.insert(scope, Role::new("admin", None)).await {
        Ok(role) => role,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let all_names: Vec<&str> = REGISTRY.iter().map(|def| def.name).collect();
    if let Err(e) = grant_all(&services, scope, admin_role.id, &all_names).await {
        return errors::domain_error_to_response(e);
    }

    let teller_role = match services.roles.insert(scope, Role::new("teller", None)).await {
        Ok(role) => role,
        Err(e) => return errors::domain_error_to_response(e),
    };
    if let Err(e) = grant_all(&services, scope, teller_role.id, TELLER_PERMISSIONS).await {
        return errors::domain_error_to_response(e);
    }

    let admin = match User::new(
        organisation_id,
        admin_email,
        "Administrator",
        &admin_password,
        admin_role.id,
    ) {
        Ok(user) => user,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let admin = match services.users.insert(scope, admin).await {
        Ok(user) => user,
        Err(e) => return errors::domain_error_to_response(e),
    };

    dto::created(
        "seeded",
        json!({
            "organisation_id": organisation_id,
            "admin_role_id": admin_role.id,
            "teller_role_id": teller_role.id,
            "admin_email": admin.email,
        }),
    )
}
