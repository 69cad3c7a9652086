//! In-memory user storage for the login/registration/seed paths.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use remitdesk_audit::{Repository, RequestScope};
use remitdesk_auth::User;
use remitdesk_core::{DomainError, DomainResult, UserId};

/// One row per user; emails are unique across the store.
#[derive(Default)]
pub struct InMemoryUserStore {
    rows: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let rows = self.rows.lock().unwrap();
        rows.values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }
}

#[async_trait]
impl Repository<User> for InMemoryUserStore {
    async fn get(&self, id: &UserId) -> DomainResult<Option<User>> {
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<User>> {
        let rows = self.rows.lock().unwrap();
        let mut users: Vec<_> = rows.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn insert(&self, _scope: RequestScope, user: User) -> DomainResult<User> {
        let mut rows = self.rows.lock().unwrap();
        if rows.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DomainError::conflict(format!(
                "a user with email '{}' already exists",
                user.email
            )));
        }
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, _scope: RequestScope, user: User) -> DomainResult<User> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&user.id) {
            return Err(DomainError::not_found(format!("user {}", user.id)));
        }
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, _scope: RequestScope, id: &UserId) -> DomainResult<Option<User>> {
        Ok(self.rows.lock().unwrap().remove(id))
    }

    async fn insert_many(&self, scope: RequestScope, users: Vec<User>) -> DomainResult<Vec<User>> {
        let mut inserted = Vec::with_capacity(users.len());
        for user in users {
            inserted.push(self.insert(scope, user).await?);
        }
        Ok(inserted)
    }

    async fn delete_many(&self, _scope: RequestScope, ids: &[UserId]) -> DomainResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        Ok(ids.iter().filter(|id| rows.remove(*id).is_some()).count() as u64)
    }
}
