//! Append-only storage port for audit records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use remitdesk_core::{DomainResult, OrganisationId, UserId};

use crate::record::AuditRecord;

/// Filters for the read-only audit query surface.
///
/// All filters are conjunctive; `None` means "any". There is deliberately
/// no way to address a record for update or delete.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub user_id: Option<UserId>,
    pub organisation_id: Option<OrganisationId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AuditQuery {
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(entity_type) = &self.entity_type {
            if &record.entity_type != entity_type {
                return false;
            }
        }
        if let Some(entity_id) = &self.entity_id {
            if &record.entity_id != entity_id {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if record.user_id != Some(user_id) {
                return false;
            }
        }
        if let Some(organisation_id) = self.organisation_id {
            if record.organisation_id != Some(organisation_id) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.created_at > to {
                return false;
            }
        }
        true
    }
}

/// Append-only audit persistence.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: AuditRecord) -> DomainResult<()>;

    /// Newest-first retrieval with conjunctive filters.
    async fn query(&self, query: &AuditQuery) -> DomainResult<Vec<AuditRecord>>;
}
