//! In-memory transaction storage with optimistic concurrency.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use remitdesk_audit::{Repository, RequestScope};
use remitdesk_core::{DomainError, DomainResult, OrganisationId, TransactionId};
use remitdesk_remit::Transaction;

/// Keeps one row per transaction and rejects stale writes.
///
/// `update` is a compare-and-swap on `version`: the caller must present the
/// version it read, and the stored row comes back bumped. Two concurrent
/// approve/cancel calls on the same read therefore cannot both succeed -
/// the loser gets a conflict instead of silently double-transitioning.
#[derive(Default)]
pub struct InMemoryTransactionStore {
    rows: Mutex<HashMap<TransactionId, Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_for_organisation(&self, organisation_id: OrganisationId) -> Vec<Transaction> {
        let rows = self.rows.lock().unwrap();
        let mut transactions: Vec<_> = rows
            .values()
            .filter(|t| t.organisation_id == organisation_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        transactions
    }
}

#[async_trait]
impl Repository<Transaction> for InMemoryTransactionStore {
    async fn get(&self, id: &TransactionId) -> DomainResult<Option<Transaction>> {
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<Transaction>> {
        let rows = self.rows.lock().unwrap();
        let mut transactions: Vec<_> = rows.values().cloned().collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn insert(&self, _scope: RequestScope, transaction: Transaction) -> DomainResult<Transaction> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&transaction.id) {
            return Err(DomainError::conflict(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        rows.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn update(&self, _scope: RequestScope, transaction: Transaction) -> DomainResult<Transaction> {
        let mut rows = self.rows.lock().unwrap();
        let Some(current) = rows.get(&transaction.id) else {
            return Err(DomainError::not_found(format!(
                "transaction {}",
                transaction.id
            )));
        };
        if current.version != transaction.version {
            return Err(DomainError::conflict(format!(
                "transaction {} was modified concurrently (expected version {}, found {})",
                transaction.id, transaction.version, current.version
            )));
        }

        let mut stored = transaction;
        stored.version += 1;
        rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, _scope: RequestScope, id: &TransactionId) -> DomainResult<Option<Transaction>> {
        Ok(self.rows.lock().unwrap().remove(id))
    }

    async fn insert_many(
        &self,
        scope: RequestScope,
        transactions: Vec<Transaction>,
    ) -> DomainResult<Vec<Transaction>> {
        let mut inserted = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            inserted.push(self.insert(scope, transaction).await?);
        }
        Ok(inserted)
    }

    async fn delete_many(&self, _scope: RequestScope, ids: &[TransactionId]) -> DomainResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        Ok(ids.iter().filter(|id| rows.remove(*id).is_some()).count() as u64)
    }
}
