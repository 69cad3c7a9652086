use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are dot-namespaced strings (e.g. "transactions.approve").
/// Matching is exact string equality: there is no wildcard and no hierarchy,
/// so a grant like "admin.roles.create" never implies "admin.roles.delete".
/// Anything broader must be expressed as enumerated individual grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the closed permission registry.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PermissionDef {
    pub name: &'static str,
    pub description: &'static str,
}

pub const TRANSACTIONS_READ: Permission = Permission::from_static("transactions.read");
pub const TRANSACTIONS_CREATE: Permission = Permission::from_static("transactions.create");
pub const TRANSACTIONS_EDIT: Permission = Permission::from_static("transactions.edit");
pub const TRANSACTIONS_MARK_READY: Permission = Permission::from_static("transactions.mark_ready");
pub const TRANSACTIONS_APPROVE: Permission = Permission::from_static("transactions.approve");
pub const TRANSACTIONS_AUTO_APPROVE: Permission =
    Permission::from_static("transactions.auto_approve");
pub const TRANSACTIONS_CANCEL: Permission = Permission::from_static("transactions.cancel");
pub const TRANSACTIONS_REVERSE: Permission = Permission::from_static("transactions.reverse");
pub const ADMIN_ROLES_READ: Permission = Permission::from_static("admin.roles.read");
pub const ADMIN_ROLES_CREATE: Permission = Permission::from_static("admin.roles.create");
pub const ADMIN_ROLES_DELETE: Permission = Permission::from_static("admin.roles.delete");
pub const ADMIN_ROLES_GRANT: Permission = Permission::from_static("admin.roles.grant");
pub const AUDIT_RECORDS_READ: Permission = Permission::from_static("audit.records.read");

/// Every permission the system knows about.
///
/// The seed path materialises this registry into permission rows; free-text
/// permission names cannot enter the system anywhere else.
pub const REGISTRY: &[PermissionDef] = &[
    PermissionDef {
        name: "transactions.read",
        description: "List and view money-transfer transactions",
    },
    PermissionDef {
        name: "transactions.create",
        description: "Create new transactions",
    },
    PermissionDef {
        name: "transactions.edit",
        description: "Edit transactions that are still pending",
    },
    PermissionDef {
        name: "transactions.mark_ready",
        description: "Mark transactions ready for approval",
    },
    PermissionDef {
        name: "transactions.approve",
        description: "Approve transactions that are ready",
    },
    PermissionDef {
        name: "transactions.auto_approve",
        description: "Create transactions directly in the approval queue bypassing review",
    },
    PermissionDef {
        name: "transactions.cancel",
        description: "Cancel transactions before settlement starts",
    },
    PermissionDef {
        name: "transactions.reverse",
        description: "Reverse approved transactions",
    },
    PermissionDef {
        name: "admin.roles.read",
        description: "View roles and their granted permissions",
    },
    PermissionDef {
        name: "admin.roles.create",
        description: "Create roles",
    },
    PermissionDef {
        name: "admin.roles.delete",
        description: "Delete roles and their grants",
    },
    PermissionDef {
        name: "admin.roles.grant",
        description: "Grant or revoke permissions on a role",
    },
    PermissionDef {
        name: "audit.records.read",
        description: "Query the audit trail",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_names_are_unique_and_dot_namespaced() {
        let mut seen = HashSet::new();
        for def in REGISTRY {
            assert!(seen.insert(def.name), "duplicate permission {}", def.name);
            assert!(def.name.contains('.'), "{} is not namespaced", def.name);
            assert!(!def.description.is_empty());
        }
    }

    #[test]
    fn consts_are_present_in_registry() {
        let names: HashSet<&str> = REGISTRY.iter().map(|d| d.name).collect();
        for p in [
            &TRANSACTIONS_READ,
            &TRANSACTIONS_CREATE,
            &TRANSACTIONS_EDIT,
            &TRANSACTIONS_MARK_READY,
            &TRANSACTIONS_APPROVE,
            &TRANSACTIONS_AUTO_APPROVE,
            &TRANSACTIONS_CANCEL,
            &TRANSACTIONS_REVERSE,
            &ADMIN_ROLES_READ,
            &ADMIN_ROLES_CREATE,
            &ADMIN_ROLES_DELETE,
            &ADMIN_ROLES_GRANT,
            &AUDIT_RECORDS_READ,
        ] {
            assert!(names.contains(p.as_str()));
        }
    }
}
