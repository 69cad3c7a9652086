//! The audit decorator.
//!
//! [`AuditedRepository`] wraps any [`Repository`] implementation for an
//! entity type that opts in via [`Audited`]. Entities that are not on the
//! audited surface simply use their repository directly - no wrapper, no
//! overhead, no runtime type-name matching.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::warn;

use remitdesk_core::{DomainResult, Entity};

use crate::context::{RequestContextStore, RequestScope};
use crate::diff::diff_tracked;
use crate::record::{AuditAction, AuditRecord, BULK_ENTITY_ID};
use crate::redact::redact_secrets;
use crate::repository::Repository;
use crate::writer::AuditWriter;

/// Opt-in trait for entity types on the audited surface.
pub trait Audited: Entity + Serialize {
    /// Stable entity-type name written into audit records.
    const ENTITY_TYPE: &'static str;

    /// Allow-list of fields diffed on update. Everything else is invisible
    /// to the audit trail, which keeps payloads bounded.
    fn tracked_fields() -> &'static [&'static str];

    /// Natural identifying key as recorded in `entity_id`.
    fn display_id(id: &Self::Id) -> String;
}

/// Repository decorator producing audit records for every mutation.
///
/// The pre-read for update/delete goes through the **inner** repository, so
/// capturing before-state can never recursively re-audit. The pre-read and
/// the mutation are not one storage transaction: a concurrent writer
/// between the two can make the diff baseline stale. The audit trail is
/// advisory; the stores close the write-write race with version checks.
pub struct AuditedRepository<T, R> {
    inner: Arc<R>,
    contexts: Arc<RequestContextStore>,
    writer: AuditWriter,
    _entity: PhantomData<fn() -> T>,
}

impl<T, R> AuditedRepository<T, R>
where
    T: Audited,
    R: Repository<T>,
{
    pub fn new(inner: Arc<R>, contexts: Arc<RequestContextStore>, writer: AuditWriter) -> Self {
        Self {
            inner,
            contexts,
            writer,
            _entity: PhantomData,
        }
    }

    /// Direct access to the undecorated repository.
    pub fn inner(&self) -> &Arc<R> {
        &self.inner
    }

    /// Redacted JSON snapshot; serialization failures degrade to `None`.
    fn snapshot(entity: &T) -> Option<JsonValue> {
        match serde_json::to_value(entity) {
            Ok(mut value) => {
                redact_secrets(&mut value);
                Some(value)
            }
            Err(e) => {
                warn!(entity_type = T::ENTITY_TYPE, error = %e, "audit snapshot failed");
                None
            }
        }
    }

    /// Best-effort isolated before-read. A failure here must not abort the
    /// primary operation; the record is then written without changes.
    async fn before_state(&self, id: &T::Id) -> Option<T> {
        match self.inner.get(id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    entity_type = T::ENTITY_TYPE,
                    error = %e,
                    "audit before-read failed; recording without changes"
                );
                None
            }
        }
    }
}

#[async_trait]
impl<T, R> Repository<T> for AuditedRepository<T, R>
where
    T: Audited + Clone + Send + Sync + 'static,
    R: Repository<T> + 'static,
{
    async fn get(&self, id: &T::Id) -> DomainResult<Option<T>> {
        self.inner.get(id).await
    }

    async fn list(&self) -> DomainResult<Vec<T>> {
        self.inner.list().await
    }

    async fn insert(&self, scope: RequestScope, entity: T) -> DomainResult<T> {
        let context = self.contexts.take(scope);

        let created = self.inner.insert(scope, entity).await?;

        let mut record = AuditRecord::new(
            AuditAction::Create,
            T::ENTITY_TYPE,
            T::display_id(&created.id()),
            &context,
        );
        if let Some(snapshot) = Self::snapshot(&created) {
            record = record.with_data(snapshot);
        }
        self.writer.enqueue(record);

        Ok(created)
    }

    async fn update(&self, scope: RequestScope, entity: T) -> DomainResult<T> {
        let context = self.contexts.take(scope);
        let before = self.before_state(&entity.id()).await;

        let updated = self.inner.update(scope, entity).await?;

        let mut record = AuditRecord::new(
            AuditAction::Update,
            T::ENTITY_TYPE,
            T::display_id(&updated.id()),
            &context,
        );
        if let (Some(before), Some(after)) =
            (before.as_ref().and_then(Self::snapshot), Self::snapshot(&updated))
        {
            record = record.with_changes(diff_tracked(&before, &after, T::tracked_fields()));
        }
        self.writer.enqueue(record);

        Ok(updated)
    }

    async fn delete(&self, scope: RequestScope, id: &T::Id) -> DomainResult<Option<T>> {
        let context = self.contexts.take(scope);
        let before = self.before_state(id).await;

        let deleted = self.inner.delete(scope, id).await?;

        if deleted.is_some() {
            let mut record = AuditRecord::new(
                AuditAction::Delete,
                T::ENTITY_TYPE,
                T::display_id(id),
                &context,
            );
            if let Some(snapshot) = before.as_ref().and_then(Self::snapshot) {
                record = record.with_data(snapshot);
            }
            self.writer.enqueue(record);
        }

        Ok(deleted)
    }

    async fn insert_many(&self, scope: RequestScope, entities: Vec<T>) -> DomainResult<Vec<T>> {
        let context = self.contexts.take(scope);

        let created = self.inner.insert_many(scope, entities).await?;

        let snapshots: Vec<JsonValue> = created.iter().filter_map(Self::snapshot).collect();
        let record = AuditRecord::new(
            AuditAction::CreateMany,
            T::ENTITY_TYPE,
            BULK_ENTITY_ID,
            &context,
        )
        .with_data(JsonValue::Array(snapshots))
        .with_metadata(json!({ "count": created.len() }));
        self.writer.enqueue(record);

        Ok(created)
    }

    async fn delete_many(&self, scope: RequestScope, ids: &[T::Id]) -> DomainResult<u64> {
        let context = self.contexts.take(scope);

        let count = self.inner.delete_many(scope, ids).await?;

        let record = AuditRecord::new(
            AuditAction::DeleteMany,
            T::ENTITY_TYPE,
            BULK_ENTITY_ID,
            &context,
        )
        .with_metadata(json!({
            "count": count,
            "ids": ids.iter().map(|id| T::display_id(id)).collect::<Vec<_>>(),
        }));
        self.writer.enqueue(record);

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::record::AuditRecord;
    use crate::redact::REDACTION_MARKER;
    use crate::store::{AuditQuery, AuditStore};
    use crate::writer;
    use remitdesk_core::{DomainError, RequestId, UserId};
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ApiClient {
        id: UserId,
        label: String,
        api_key: String,
        status: String,
        note: String,
    }

    impl Entity for ApiClient {
        type Id = UserId;

        fn id(&self) -> Self::Id {
            self.id
        }
    }

    impl Audited for ApiClient {
        const ENTITY_TYPE: &'static str = "api_client";

        fn tracked_fields() -> &'static [&'static str] {
            &["label", "status"]
        }

        fn display_id(id: &Self::Id) -> String {
            id.to_string()
        }
    }

    #[derive(Default)]
    struct MemRepo {
        rows: Mutex<HashMap<UserId, ApiClient>>,
        fail_get: AtomicBool,
    }

    #[async_trait]
    impl Repository<ApiClient> for MemRepo {
        async fn get(&self, id: &UserId) -> DomainResult<Option<ApiClient>> {
            if self.fail_get.load(Ordering::Relaxed) {
                return Err(DomainError::internal("read failed"));
            }
            Ok(self.rows.lock().unwrap().get(id).cloned())
        }

        async fn list(&self) -> DomainResult<Vec<ApiClient>> {
            Ok(self.rows.lock().unwrap().values().cloned().collect())
        }

        async fn insert(&self, _scope: RequestScope, entity: ApiClient) -> DomainResult<ApiClient> {
            self.rows.lock().unwrap().insert(entity.id, entity.clone());
            Ok(entity)
        }

        async fn update(&self, _scope: RequestScope, entity: ApiClient) -> DomainResult<ApiClient> {
            self.rows.lock().unwrap().insert(entity.id, entity.clone());
            Ok(entity)
        }

        async fn delete(&self, _scope: RequestScope, id: &UserId) -> DomainResult<Option<ApiClient>> {
            Ok(self.rows.lock().unwrap().remove(id))
        }

        async fn insert_many(
            &self,
            _scope: RequestScope,
            entities: Vec<ApiClient>,
        ) -> DomainResult<Vec<ApiClient>> {
            let mut rows = self.rows.lock().unwrap();
            for entity in &entities {
                rows.insert(entity.id, entity.clone());
            }
            Ok(entities)
        }

        async fn delete_many(&self, _scope: RequestScope, ids: &[UserId]) -> DomainResult<u64> {
            let mut rows = self.rows.lock().unwrap();
            Ok(ids.iter().filter(|id| rows.remove(*id).is_some()).count() as u64)
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        records: Mutex<Vec<AuditRecord>>,
    }

    #[async_trait]
    impl AuditStore for RecordingStore {
        async fn append(&self, record: AuditRecord) -> DomainResult<()> {
            self.records.lock().unwrap().push(record);
            Ok(())
        }

        async fn query(&self, query: &AuditQuery) -> DomainResult<Vec<AuditRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| query.matches(r))
                .cloned()
                .collect())
        }
    }

    struct Fixture {
        repo: AuditedRepository<ApiClient, MemRepo>,
        inner: Arc<MemRepo>,
        contexts: Arc<RequestContextStore>,
        store: Arc<RecordingStore>,
        writer: AuditWriter,
    }

    fn fixture() -> Fixture {
        let inner = Arc::new(MemRepo::default());
        let contexts = Arc::new(RequestContextStore::default());
        let store = Arc::new(RecordingStore::default());
        let (writer, _handle) = writer::spawn(store.clone(), 64);
        let repo = AuditedRepository::new(inner.clone(), contexts.clone(), writer.clone());
        Fixture {
            repo,
            inner,
            contexts,
            store,
            writer,
        }
    }

    fn client(label: &str) -> ApiClient {
        ApiClient {
            id: UserId::new(),
            label: label.to_string(),
            api_key: "super-secret".to_string(),
            status: "active".to_string(),
            note: "untracked".to_string(),
        }
    }

    async fn flushed_records(f: &Fixture) -> Vec<AuditRecord> {
        f.writer.drain(Duration::from_secs(1)).await;
        f.store.records.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn create_snapshots_with_redaction() {
        let f = fixture();
        let created = f
            .repo
            .insert(RequestScope::anonymous(), client("alpha"))
            .await
            .unwrap();

        let records = flushed_records(&f).await;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.action, AuditAction::Create);
        assert_eq!(record.entity_type, "api_client");
        assert_eq!(record.entity_id, created.id.to_string());

        let data = record.data.as_ref().unwrap();
        assert_eq!(data["label"], "alpha");
        assert_eq!(data["api_key"], REDACTION_MARKER);
    }

    #[tokio::test]
    async fn update_diffs_tracked_fields_only() {
        let f = fixture();
        let mut row = f
            .repo
            .insert(RequestScope::anonymous(), client("alpha"))
            .await
            .unwrap();

        row.status = "disabled".to_string();
        row.note = "changed but untracked".to_string();
        f.repo.update(RequestScope::anonymous(), row).await.unwrap();

        let records = flushed_records(&f).await;
        let update = &records[1];
        assert_eq!(update.action, AuditAction::Update);

        let changes = update.changes.as_ref().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["status"].old, "active");
        assert_eq!(changes["status"].new, "disabled");
    }

    #[tokio::test]
    async fn update_with_no_tracked_change_has_no_changes() {
        let f = fixture();
        let mut row = f
            .repo
            .insert(RequestScope::anonymous(), client("alpha"))
            .await
            .unwrap();

        row.note = "only the untracked field moves".to_string();
        f.repo.update(RequestScope::anonymous(), row).await.unwrap();

        let records = flushed_records(&f).await;
        assert_eq!(records[1].changes, None);
    }

    #[tokio::test]
    async fn failed_before_read_does_not_abort_the_write() {
        let f = fixture();
        let mut row = f
            .repo
            .insert(RequestScope::anonymous(), client("alpha"))
            .await
            .unwrap();

        f.inner.fail_get.store(true, Ordering::Relaxed);
        row.status = "disabled".to_string();
        let updated = f.repo.update(RequestScope::anonymous(), row).await.unwrap();
        assert_eq!(updated.status, "disabled");

        let records = flushed_records(&f).await;
        assert_eq!(records[1].action, AuditAction::Update);
        assert_eq!(records[1].changes, None);
    }

    #[tokio::test]
    async fn delete_records_prior_state() {
        let f = fixture();
        let row = f
            .repo
            .insert(RequestScope::anonymous(), client("alpha"))
            .await
            .unwrap();

        let deleted = f.repo.delete(RequestScope::anonymous(), &row.id).await.unwrap();
        assert!(deleted.is_some());

        let records = flushed_records(&f).await;
        let record = &records[1];
        assert_eq!(record.action, AuditAction::Delete);
        assert_eq!(record.entity_id, row.id.to_string());
        assert_eq!(record.data.as_ref().unwrap()["label"], "alpha");
        assert_eq!(record.data.as_ref().unwrap()["api_key"], REDACTION_MARKER);
    }

    #[tokio::test]
    async fn deleting_a_missing_row_is_not_audited() {
        let f = fixture();
        let ghost = UserId::new();
        assert!(f
            .repo
            .delete(RequestScope::anonymous(), &ghost)
            .await
            .unwrap()
            .is_none());
        assert!(flushed_records(&f).await.is_empty());
    }

    #[tokio::test]
    async fn context_is_attributed_and_consumed_once() {
        let f = fixture();
        let request_id = RequestId::new();
        let user = UserId::new();
        f.contexts.seed(
            request_id,
            RequestContext {
                user_id: Some(user),
                ip_address: Some("10.1.2.3".to_string()),
                request_id: Some(request_id),
                ..RequestContext::default()
            },
        );

        let scope = RequestScope::for_request(request_id);
        f.repo.insert(scope, client("first")).await.unwrap();
        // Context was consumed; a second mutation on the same scope is anonymous.
        f.repo.insert(scope, client("second")).await.unwrap();

        let records = flushed_records(&f).await;
        assert_eq!(records[0].user_id, Some(user));
        assert_eq!(records[0].ip_address.as_deref(), Some("10.1.2.3"));
        assert_eq!(records[0].request_id, Some(request_id));
        assert_eq!(records[1].user_id, None);
        assert_eq!(records[1].ip_address, None);
    }

    #[tokio::test]
    async fn repeated_create_is_not_idempotent() {
        let f = fixture();
        let a = f
            .repo
            .insert(RequestScope::anonymous(), client("same"))
            .await
            .unwrap();
        let b = f
            .repo
            .insert(RequestScope::anonymous(), client("same"))
            .await
            .unwrap();

        assert_ne!(a.id, b.id);
        let records = flushed_records(&f).await;
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
    }

    #[tokio::test]
    async fn bulk_operations_use_the_bulk_marker() {
        let f = fixture();
        let rows = vec![client("a"), client("b")];
        let ids: Vec<UserId> = rows.iter().map(|r| r.id).collect();

        f.repo
            .insert_many(RequestScope::anonymous(), rows)
            .await
            .unwrap();
        f.repo
            .delete_many(RequestScope::anonymous(), &ids)
            .await
            .unwrap();

        let records = flushed_records(&f).await;
        assert_eq!(records[0].action, AuditAction::CreateMany);
        assert_eq!(records[0].entity_id, BULK_ENTITY_ID);
        assert_eq!(records[0].metadata.as_ref().unwrap()["count"], 2);
        assert_eq!(records[0].data.as_ref().unwrap()[0]["api_key"], REDACTION_MARKER);

        assert_eq!(records[1].action, AuditAction::DeleteMany);
        assert_eq!(records[1].entity_id, BULK_ENTITY_ID);
        assert_eq!(records[1].metadata.as_ref().unwrap()["count"], 2);
    }
}
