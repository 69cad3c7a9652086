use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use remitdesk_core::{OrganisationId, RoleId, UserId};

use crate::claims::Claims;
use crate::permissions::Permission;

/// Account lifecycle status carried in claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

/// A fully resolved principal for authorization decisions.
///
/// Constructed fresh per request from verified claims plus the role's
/// permission set read from storage; never persisted as-is. A role that no
/// longer resolves degrades to an **empty** permission set - absent role
/// must mean "no permissions", never "all permissions".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role_id: RoleId,
    pub organisation_id: OrganisationId,
    pub status: AccountStatus,
    pub permissions: HashSet<Permission>,
}

impl Principal {
    pub fn from_claims(claims: Claims, permissions: HashSet<Permission>) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role_id: claims.role_id,
            organisation_id: claims.organisation_id,
            status: claims.status,
            permissions,
        }
    }

    pub fn has_permission(&self, required: &Permission) -> bool {
        self.permissions.contains(required)
    }
}
