//! The narrow persistence port domain code talks to.

use async_trait::async_trait;

use remitdesk_core::{DomainResult, Entity};

use crate::context::RequestScope;

/// CRUD port over one entity type.
///
/// Mutating calls carry a [`RequestScope`] so the audit decorator can
/// attribute them; plain storage implementations ignore it. Reads take no
/// scope - they are never audited.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn get(&self, id: &T::Id) -> DomainResult<Option<T>>;

    async fn list(&self) -> DomainResult<Vec<T>>;

    async fn insert(&self, scope: RequestScope, entity: T) -> DomainResult<T>;

    /// Full-row replacement keyed by the entity's id.
    async fn update(&self, scope: RequestScope, entity: T) -> DomainResult<T>;

    /// Returns the deleted row, if any.
    async fn delete(&self, scope: RequestScope, id: &T::Id) -> DomainResult<Option<T>>;

    async fn insert_many(&self, scope: RequestScope, entities: Vec<T>) -> DomainResult<Vec<T>>;

    /// Returns the number of rows deleted.
    async fn delete_many(&self, scope: RequestScope, ids: &[T::Id]) -> DomainResult<u64>;
}
