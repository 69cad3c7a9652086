use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use remitdesk_audit::Audited;
use remitdesk_core::{Entity, PermissionId, RoleId, UserId};

use crate::permissions::Permission;

/// A named bundle of permissions within one organisation.
///
/// Roles own their grants through [`RolePermission`]; deleting a role
/// cascades deletion of those rows (enforced by the RBAC store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    /// Provenance for the audit trail.
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: impl Into<String>, created_by: Option<UserId>) -> Self {
        Self {
            id: RoleId::new(),
            name: name.into(),
            description: None,
            created_by,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Audited for Role {
    const ENTITY_TYPE: &'static str = "role";

    fn tracked_fields() -> &'static [&'static str] {
        &["name", "description"]
    }

    fn display_id(id: &Self::Id) -> String {
        id.to_string()
    }
}

/// Catalog row for a permission name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub id: PermissionId,
    /// Globally unique, dot-namespaced.
    pub name: Permission,
    pub description: Option<String>,
}

impl Entity for PermissionEntry {
    type Id = PermissionId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Join row granting one permission to one role.
///
/// The (role_id, permission_id) pair is unique; `created_by` carries audit
/// provenance for the grant itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl RolePermission {
    pub fn new(role_id: RoleId, permission_id: PermissionId, created_by: Option<UserId>) -> Self {
        Self {
            role_id,
            permission_id,
            created_by,
            created_at: Utc::now(),
        }
    }
}

impl Entity for RolePermission {
    /// The unique pair is the natural key; there is no surrogate id.
    type Id = (RoleId, PermissionId);

    fn id(&self) -> Self::Id {
        (self.role_id, self.permission_id)
    }
}

impl Audited for RolePermission {
    const ENTITY_TYPE: &'static str = "role_permission";

    /// Grants are created and deleted, never edited; nothing to diff.
    fn tracked_fields() -> &'static [&'static str] {
        &[]
    }

    fn display_id((role_id, permission_id): &Self::Id) -> String {
        format!("{role_id}:{permission_id}")
    }
}
