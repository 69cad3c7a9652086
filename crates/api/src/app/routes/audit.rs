//! Read-only audit trail queries.
//!
//! There is intentionally no mutation surface for audit data anywhere in
//! this API.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    routing::get,
    Router,
};
use serde_json::json;

use remitdesk_audit::AuditQuery;
use remitdesk_auth::{permissions, Principal};

use crate::app::{dto, errors, services::AppServices};
use crate::authz;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

pub fn router() -> Router {
    Router::new().route("/audit/records", get(query_records))
}

/// GET /audit/records?entity_type=&entity_id=&user_id=&organisation_id=&from=&to=
pub async fn query_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<dto::AuditQueryParams>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::AUDIT_RECORDS_READ,
        "not allowed to query the audit trail",
    ) {
        return resp;
    }

    let query = AuditQuery {
        entity_type: params.entity_type,
        entity_id: params.entity_id,
        user_id: params.user_id,
        organisation_id: params.organisation_id,
        from: params.from,
        to: params.to,
        limit: Some(params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)),
        offset: params.offset,
    };

    match services.audit_store.query(&query).await {
        Ok(records) => {
            let count = records.len();
            dto::ok("audit records", json!({ "records": records, "count": count }))
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
