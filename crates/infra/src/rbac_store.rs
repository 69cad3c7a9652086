//! Role/permission storage and the per-request permission resolution port.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use remitdesk_audit::{Repository, RequestScope};
use remitdesk_auth::{Permission, PermissionEntry, Role, RolePermission, REGISTRY};
use remitdesk_core::{DomainError, DomainResult, PermissionId, RoleId};

/// Resolves a role into its granted permission names.
///
/// Invoked once per authenticated request by the session resolver. A role
/// id that resolves to nothing yields the empty set - the caller must treat
/// that as "no permissions", never as an error.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    async fn permissions_for_role(&self, role_id: RoleId) -> DomainResult<HashSet<Permission>>;
}

#[derive(Default)]
struct RbacState {
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, PermissionEntry>,
    grants: HashMap<(RoleId, PermissionId), RolePermission>,
}

/// In-memory RBAC store: roles, the permission catalog, and the grant join.
///
/// Implements [`Repository`] for both [`Role`] and [`RolePermission`] so
/// each can sit behind the audit decorator independently.
#[derive(Default)]
pub struct InMemoryRbacStore {
    state: Mutex<RbacState>,
}

impl InMemoryRbacStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialise the closed permission registry into catalog rows.
    /// Idempotent; called once at startup/seed.
    pub fn seed_registry(&self) {
        let mut state = self.state.lock().unwrap();
        for def in REGISTRY {
            let exists = state
                .permissions
                .values()
                .any(|p| p.name.as_str() == def.name);
            if !exists {
                let entry = PermissionEntry {
                    id: PermissionId::new(),
                    name: Permission::from_static(def.name),
                    description: Some(def.description.to_string()),
                };
                state.permissions.insert(entry.id, entry);
            }
        }
    }

    pub fn permission_entries(&self) -> Vec<PermissionEntry> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<_> = state.permissions.values().cloned().collect();
        entries.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        entries
    }

    pub fn find_permission(&self, name: &str) -> Option<PermissionEntry> {
        let state = self.state.lock().unwrap();
        state
            .permissions
            .values()
            .find(|p| p.name.as_str() == name)
            .cloned()
    }

    pub fn find_role_by_name(&self, name: &str) -> Option<Role> {
        let state = self.state.lock().unwrap();
        state.roles.values().find(|r| r.name == name).cloned()
    }
}

#[async_trait]
impl PermissionResolver for InMemoryRbacStore {
    async fn permissions_for_role(&self, role_id: RoleId) -> DomainResult<HashSet<Permission>> {
        let state = self.state.lock().unwrap();
        // Role -> RolePermission -> Permission. An unknown role joins to
        // nothing and comes back as the empty set.
        Ok(state
            .grants
            .keys()
            .filter(|(rid, _)| *rid == role_id)
            .filter_map(|(_, pid)| state.permissions.get(pid))
            .map(|entry| entry.name.clone())
            .collect())
    }
}

#[async_trait]
impl Repository<Role> for InMemoryRbacStore {
    async fn get(&self, id: &RoleId) -> DomainResult<Option<Role>> {
        Ok(self.state.lock().unwrap().roles.get(id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<Role>> {
        let state = self.state.lock().unwrap();
        let mut roles: Vec<_> = state.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn insert(&self, _scope: RequestScope, role: Role) -> DomainResult<Role> {
        let mut state = self.state.lock().unwrap();
        if state.roles.values().any(|r| r.name == role.name) {
            return Err(DomainError::conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update(&self, _scope: RequestScope, role: Role) -> DomainResult<Role> {
        let mut state = self.state.lock().unwrap();
        if !state.roles.contains_key(&role.id) {
            return Err(DomainError::not_found(format!("role {}", role.id)));
        }
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    /// Deleting a role cascades deletion of its grant rows.
    async fn delete(&self, _scope: RequestScope, id: &RoleId) -> DomainResult<Option<Role>> {
        let mut state = self.state.lock().unwrap();
        let removed = state.roles.remove(id);
        if removed.is_some() {
            state.grants.retain(|(rid, _), _| rid != id);
        }
        Ok(removed)
    }

    async fn insert_many(&self, scope: RequestScope, roles: Vec<Role>) -> DomainResult<Vec<Role>> {
        let mut inserted = Vec::with_capacity(roles.len());
        for role in roles {
            inserted.push(Repository::<Role>::insert(self, scope, role).await?);
        }
        Ok(inserted)
    }

    async fn delete_many(&self, scope: RequestScope, ids: &[RoleId]) -> DomainResult<u64> {
        let mut count = 0;
        for id in ids {
            if Repository::<Role>::delete(self, scope, id).await?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl Repository<RolePermission> for InMemoryRbacStore {
    async fn get(&self, id: &(RoleId, PermissionId)) -> DomainResult<Option<RolePermission>> {
        Ok(self.state.lock().unwrap().grants.get(id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<RolePermission>> {
        Ok(self.state.lock().unwrap().grants.values().cloned().collect())
    }

    async fn insert(
        &self,
        _scope: RequestScope,
        grant: RolePermission,
    ) -> DomainResult<RolePermission> {
        let mut state = self.state.lock().unwrap();
        if !state.roles.contains_key(&grant.role_id) {
            return Err(DomainError::not_found(format!("role {}", grant.role_id)));
        }
        if !state.permissions.contains_key(&grant.permission_id) {
            return Err(DomainError::not_found(format!(
                "permission {}",
                grant.permission_id
            )));
        }
        let key = (grant.role_id, grant.permission_id);
        if state.grants.contains_key(&key) {
            return Err(DomainError::conflict("permission already granted to role"));
        }
        state.grants.insert(key, grant.clone());
        Ok(grant)
    }

    async fn update(
        &self,
        _scope: RequestScope,
        _grant: RolePermission,
    ) -> DomainResult<RolePermission> {
        // Grants are granted or revoked, never edited.
        Err(DomainError::validation("role grants cannot be updated"))
    }

    async fn delete(
        &self,
        _scope: RequestScope,
        id: &(RoleId, PermissionId),
    ) -> DomainResult<Option<RolePermission>> {
        Ok(self.state.lock().unwrap().grants.remove(id))
    }

    async fn insert_many(
        &self,
        scope: RequestScope,
        grants: Vec<RolePermission>,
    ) -> DomainResult<Vec<RolePermission>> {
        let mut inserted = Vec::with_capacity(grants.len());
        for grant in grants {
            inserted.push(Repository::<RolePermission>::insert(self, scope, grant).await?);
        }
        Ok(inserted)
    }

    async fn delete_many(
        &self,
        scope: RequestScope,
        ids: &[(RoleId, PermissionId)],
    ) -> DomainResult<u64> {
        let mut count = 0;
        for id in ids {
            if Repository::<RolePermission>::delete(self, scope, id).await?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }
}
