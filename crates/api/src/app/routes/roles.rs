//! Role administration: create/inspect/delete roles and manage grants.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use remitdesk_audit::{Repository, RequestScope};
use remitdesk_auth::{permissions, Principal, Role, RolePermission};
use remitdesk_core::RoleId;
use remitdesk_infra::PermissionResolver;

use crate::app::{dto, errors, services::AppServices};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/admin/permissions", get(list_permissions))
        .route("/admin/roles", get(list_roles).post(create_role))
        .route("/admin/roles/:id", get(get_role).delete(delete_role))
        .route("/admin/roles/:id/permissions", post(grant_permission))
        .route(
            "/admin/roles/:id/permissions/:name",
            delete(revoke_permission),
        )
}

async fn role_json(services: &AppServices, role: &Role) -> serde_json::Value {
    let mut granted: Vec<String> = services
        .rbac
        .permissions_for_role(role.id)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|p| p.as_str().to_string())
        .collect();
    granted.sort_unstable();

    json!({
        "id": role.id,
        "name": role.name,
        "description": role.description,
        "created_by": role.created_by,
        "created_at": role.created_at,
        "permissions": granted,
    })
}

/// GET /admin/permissions - the closed permission catalog.
pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::ADMIN_ROLES_READ,
        "not allowed to view permissions",
    ) {
        return resp;
    }

    dto::ok(
        "permissions",
        json!({ "permissions": services.rbac.permission_entries() }),
    )
}

/// GET /admin/roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::ADMIN_ROLES_READ,
        "not allowed to view roles",
    ) {
        return resp;
    }

    let roles = match services.roles.list().await {
        Ok(roles) => roles,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let mut out = Vec::with_capacity(roles.len());
    for role in &roles {
        out.push(role_json(&services, role).await);
    }
    dto::ok("roles", json!({ "roles": out }))
}

/// POST /admin/roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<RequestScope>,
    Json(req): Json<dto::CreateRoleRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::ADMIN_ROLES_CREATE,
        "not allowed to create roles",
    ) {
        return resp;
    }

    let name = req.name.trim();
    if name.is_empty() {
        return errors::validation_error("role name must not be empty");
    }

    let mut role = Role::new(name, Some(principal.user_id));
    if let Some(description) = req.description {
        role = role.with_description(description);
    }

    match services.roles.insert(scope, role).await {
        Ok(role) => dto::created("role created", json!({ "role": role_json(&services, &role).await })),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// GET /admin/roles/:id
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<RoleId>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::ADMIN_ROLES_READ,
        "not allowed to view roles",
    ) {
        return resp;
    }

    match services.roles.get(&id).await {
        Ok(Some(role)) => dto::ok("role", json!({ "role": role_json(&services, &role).await })),
        Ok(None) => errors::not_found("role not found"),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// DELETE /admin/roles/:id - cascades deletion of the role's grants.
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<RequestScope>,
    Path(id): Path<RoleId>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::ADMIN_ROLES_DELETE,
        "not allowed to delete roles",
    ) {
        return resp;
    }

    match services.roles.delete(scope, &id).await {
        Ok(Some(role)) => dto::ok("role deleted", json!({ "id": role.id })),
        Ok(None) => errors::not_found("role not found"),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /admin/roles/:id/permissions - grant a registry permission.
pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<RequestScope>,
    Path(id): Path<RoleId>,
    Json(req): Json<dto::GrantPermissionRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::ADMIN_ROLES_GRANT,
        "not allowed to manage role permissions",
    ) {
        return resp;
    }

    match services.roles.get(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::not_found("role not found"),
        Err(e) => return errors::domain_error_to_response(e),
    }

    // Free-text names are rejected here: only the registry can be granted.
    let Some(entry) = services.rbac.find_permission(&req.permission) else {
        return errors::validation_error(format!(
            "'{}' is not a known permission",
            req.permission
        ));
    };

    let grant = RolePermission::new(id, entry.id, Some(principal.user_id));
    match services.grants.insert(scope, grant).await {
        Ok(grant) => dto::created(
            "permission granted",
            json!({ "role_id": grant.role_id, "permission": entry.name }),
        ),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// DELETE /admin/roles/:id/permissions/:name - revoke a grant.
pub async fn revoke_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<RequestScope>,
    Path((id, name)): Path<(RoleId, String)>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::ADMIN_ROLES_GRANT,
        "not allowed to manage role permissions",
    ) {
        return resp;
    }

    let Some(entry) = services.rbac.find_permission(&name) else {
        return errors::validation_error(format!("'{name}' is not a known permission"));
    };

    match services.grants.delete(scope, &(id, entry.id)).await {
        Ok(Some(_)) => dto::ok_empty("permission revoked"),
        Ok(None) => errors::not_found("permission is not granted to this role"),
        Err(e) => errors::domain_error_to_response(e),
    }
}
