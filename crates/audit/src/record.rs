use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use remitdesk_core::{AuditRecordId, OrganisationId, RequestId, UserId};

use crate::context::RequestContext;
use crate::diff::FieldChange;

/// Synthetic entity id recorded for multi-row operations, where no single
/// natural key exists.
pub const BULK_ENTITY_ID: &str = "bulk";

/// The persistence verb an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    CreateMany,
    UpdateMany,
    DeleteMany,
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::CreateMany => "CREATE_MANY",
            AuditAction::UpdateMany => "UPDATE_MANY",
            AuditAction::DeleteMany => "DELETE_MANY",
        };
        f.write_str(s)
    }
}

/// One immutable row of the audit trail.
///
/// Append-only: nothing in this workspace updates or deletes a record after
/// insert, and the query surface is read-only by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    /// Absent for system actions and unauthenticated mutations.
    pub user_id: Option<UserId>,
    pub entity_type: String,
    pub entity_id: String,
    pub action: AuditAction,
    pub organisation_id: Option<OrganisationId>,
    pub ip_address: Option<String>,
    pub request_id: Option<RequestId>,
    /// Redacted snapshot: the created row, or the prior state of a deleted row.
    pub data: Option<JsonValue>,
    /// Field-level diff for updates, restricted to the tracked allow-list.
    pub changes: Option<BTreeMap<String, FieldChange>>,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        context: &RequestContext,
    ) -> Self {
        Self {
            id: AuditRecordId::new(),
            user_id: context.user_id,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            action,
            organisation_id: context.organisation_id,
            ip_address: context.ip_address.clone(),
            request_id: context.request_id,
            data: None,
            changes: None,
            metadata: context.metadata.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_changes(mut self, changes: BTreeMap<String, FieldChange>) -> Self {
        if !changes.is_empty() {
            self.changes = Some(changes);
        }
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
