//! Audit record persistence: in-memory and Postgres.
//!
//! Both implementations are append-only by construction - the port has no
//! update or delete, and neither does the SQL.

use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use remitdesk_audit::{AuditAction, AuditQuery, AuditRecord, AuditStore};
use remitdesk_core::{DomainError, DomainResult};

/// In-memory audit log (dev mode and tests).
#[derive(Default)]
pub struct InMemoryAuditStore {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, record: AuditRecord) -> DomainResult<()> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> DomainResult<Vec<AuditRecord>> {
        let records = self.records.lock().unwrap();
        let mut matched: Vec<AuditRecord> = records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }
}

fn action_to_str(action: AuditAction) -> &'static str {
    match action {
        AuditAction::Create => "CREATE",
        AuditAction::Update => "UPDATE",
        AuditAction::Delete => "DELETE",
        AuditAction::CreateMany => "CREATE_MANY",
        AuditAction::UpdateMany => "UPDATE_MANY",
        AuditAction::DeleteMany => "DELETE_MANY",
    }
}

fn action_from_str(s: &str) -> DomainResult<AuditAction> {
    match s {
        "CREATE" => Ok(AuditAction::Create),
        "UPDATE" => Ok(AuditAction::Update),
        "DELETE" => Ok(AuditAction::Delete),
        "CREATE_MANY" => Ok(AuditAction::CreateMany),
        "UPDATE_MANY" => Ok(AuditAction::UpdateMany),
        "DELETE_MANY" => Ok(AuditAction::DeleteMany),
        other => Err(DomainError::internal(format!("unknown audit action '{other}'"))),
    }
}

/// Postgres audit log.
///
/// Schema: `audit_records(id uuid pk, user_id uuid null, entity_type text,
/// entity_id text, action text, organisation_id uuid null, ip_address text
/// null, request_id uuid null, data jsonb null, changes jsonb null,
/// metadata jsonb null, created_at timestamptz)`.
#[derive(Debug, Clone)]
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    #[instrument(skip(self, record), fields(entity_type = %record.entity_type, action = %record.action))]
    async fn append(&self, record: AuditRecord) -> DomainResult<()> {
        let changes = record
            .changes
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| DomainError::internal(format!("changes serialization failed: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO audit_records
                (id, user_id, entity_type, entity_id, action, organisation_id,
                 ip_address, request_id, data, changes, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.map(|id| *id.as_uuid()))
        .bind(&record.entity_type)
        .bind(&record.entity_id)
        .bind(action_to_str(record.action))
        .bind(record.organisation_id.map(|id| *id.as_uuid()))
        .bind(&record.ip_address)
        .bind(record.request_id.map(|id| *id.as_uuid()))
        .bind(&record.data)
        .bind(&changes)
        .bind(&record.metadata)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::internal(format!("audit append failed: {e}")))?;

        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> DomainResult<Vec<AuditRecord>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT id, user_id, entity_type, entity_id, action, organisation_id, \
             ip_address, request_id, data, changes, metadata, created_at \
             FROM audit_records WHERE 1=1",
        );

        if let Some(entity_type) = &query.entity_type {
            builder.push(" AND entity_type = ").push_bind(entity_type);
        }
        if let Some(entity_id) = &query.entity_id {
            builder.push(" AND entity_id = ").push_bind(entity_id);
        }
        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ").push_bind(*user_id.as_uuid());
        }
        if let Some(organisation_id) = query.organisation_id {
            builder
                .push(" AND organisation_id = ")
                .push_bind(*organisation_id.as_uuid());
        }
        if let Some(from) = query.from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = query.to {
            builder.push(" AND created_at <= ").push_bind(to);
        }

        builder.push(" ORDER BY created_at DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            builder.push(" OFFSET ").push_bind(offset as i64);
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::internal(format!("audit query failed: {e}")))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let changes = row
                .get::<Option<serde_json::Value>, _>("changes")
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| {
                    DomainError::internal(format!("changes deserialization failed: {e}"))
                })?;

            records.push(AuditRecord {
                id: row.get::<uuid::Uuid, _>("id").into(),
                user_id: row.get::<Option<uuid::Uuid>, _>("user_id").map(Into::into),
                entity_type: row.get("entity_type"),
                entity_id: row.get("entity_id"),
                action: action_from_str(row.get::<String, _>("action").as_str())?,
                organisation_id: row
                    .get::<Option<uuid::Uuid>, _>("organisation_id")
                    .map(Into::into),
                ip_address: row.get("ip_address"),
                request_id: row.get::<Option<uuid::Uuid>, _>("request_id").map(Into::into),
                data: row.get("data"),
                changes,
                metadata: row.get("metadata"),
                created_at: row.get("created_at"),
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remitdesk_audit::RequestContext;
    use remitdesk_core::{OrganisationId, UserId};

    fn record_for(entity_type: &str, user: Option<UserId>, org: Option<OrganisationId>) -> AuditRecord {
        let context = RequestContext {
            user_id: user,
            organisation_id: org,
            ..RequestContext::default()
        };
        AuditRecord::new(AuditAction::Create, entity_type, "x", &context)
    }

    #[tokio::test]
    async fn filters_are_conjunctive() {
        let store = InMemoryAuditStore::new();
        let user = UserId::new();
        let org = OrganisationId::new();

        store.append(record_for("transaction", Some(user), Some(org))).await.unwrap();
        store.append(record_for("transaction", None, Some(org))).await.unwrap();
        store.append(record_for("role", Some(user), Some(org))).await.unwrap();

        let by_type = store
            .query(&AuditQuery {
                entity_type: Some("transaction".to_string()),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(by_type.len(), 2);

        let by_type_and_user = store
            .query(&AuditQuery {
                entity_type: Some("transaction".to_string()),
                user_id: Some(user),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(by_type_and_user.len(), 1);
    }

    #[tokio::test]
    async fn results_are_newest_first_and_paged() {
        let store = InMemoryAuditStore::new();
        for _ in 0..5 {
            store.append(record_for("transaction", None, None)).await.unwrap();
        }

        let page = store
            .query(&AuditQuery {
                limit: Some(2),
                offset: Some(1),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].created_at >= page[1].created_at);
    }

    #[test]
    fn action_roundtrip() {
        for action in [
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Delete,
            AuditAction::CreateMany,
            AuditAction::UpdateMany,
            AuditAction::DeleteMany,
        ] {
            assert_eq!(action_from_str(action_to_str(action)).unwrap(), action);
        }
        assert!(action_from_str("TRUNCATE").is_err());
    }
}
