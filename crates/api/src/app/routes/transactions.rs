//! Transaction lifecycle endpoints.
//!
//! Every action is gated twice: by the route's required permission, and by
//! the lifecycle table the domain enforces. Status writes go through the
//! audited repository under an optimistic version check; a concurrent
//! transition surfaces as a conflict rather than a double-apply.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use remitdesk_audit::{Repository, RequestScope};
use remitdesk_auth::{permissions, Principal};
use remitdesk_core::TransactionId;
use remitdesk_remit::{allowed_actions, Corridor, CreateTransaction, Transaction, UpdateTransaction};

use crate::app::{dto, errors, services::AppServices};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/:id", get(get_transaction).put(update_transaction))
        .route("/transactions/:id/mark-ready", post(mark_ready))
        .route("/transactions/:id/approve", post(approve))
        .route("/transactions/:id/cancel", post(cancel))
        .route("/transactions/:id/reverse", post(reverse))
}

/// Serialize a transaction plus the actions its current state permits, so
/// clients reflect the lifecycle table instead of re-deriving it.
fn transaction_json(tx: &Transaction) -> serde_json::Value {
    let mut value = serde_json::to_value(tx).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "allowed_actions".to_string(),
            json!(allowed_actions(tx.status, tx.remittance_status)),
        );
    }
    value
}

/// Fetch a transaction, scoped to the caller's organisation.
async fn load_owned(
    services: &AppServices,
    principal: &Principal,
    id: TransactionId,
) -> Result<Transaction, axum::response::Response> {
    match services.transactions.get(&id).await {
        Ok(Some(tx)) if tx.organisation_id == principal.organisation_id => Ok(tx),
        Ok(_) => Err(errors::not_found("transaction not found")),
        Err(e) => Err(errors::domain_error_to_response(e)),
    }
}

/// GET /transactions
pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::TRANSACTIONS_READ,
        "not allowed to view transactions",
    ) {
        return resp;
    }

    let transactions = services
        .transactions
        .inner()
        .list_for_organisation(principal.organisation_id);
    let out: Vec<_> = transactions.iter().map(transaction_json).collect();
    let count = out.len();
    dto::ok("transactions", json!({ "transactions": out, "count": count }))
}

/// GET /transactions/:id
pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<TransactionId>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::TRANSACTIONS_READ,
        "not allowed to view transactions",
    ) {
        return resp;
    }

    match load_owned(&services, &principal, id).await {
        Ok(tx) => dto::ok("transaction", json!({ "transaction": transaction_json(&tx) })),
        Err(resp) => resp,
    }
}

/// POST /transactions
pub async fn create_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<RequestScope>,
    Json(req): Json<dto::CreateTransactionRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::TRANSACTIONS_CREATE,
        "not allowed to create transactions",
    ) {
        return resp;
    }

    let corridor = match Corridor::new(req.origin_country, req.destination_country) {
        Ok(corridor) => corridor,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let cmd = CreateTransaction {
        organisation_id: principal.organisation_id,
        direction: req.direction,
        origin_amount: req.origin_amount,
        origin_currency: req.origin_currency,
        dest_currency: req.dest_currency,
        rate: req.rate,
        corridor,
        customer_id: req.customer_id,
        beneficiary_id: req.beneficiary_id,
        sender_name: req.sender_name,
        receiver_name: req.receiver_name,
        charges: req.charges.into_iter().map(Into::into).collect(),
        remarks: req.remarks,
        created_by: Some(principal.user_id),
    };

    // Creators without the auto-approve grant land in the review queue.
    let needs_review = !principal.has_permission(&permissions::TRANSACTIONS_AUTO_APPROVE);

    let tx = match Transaction::create(cmd, needs_review) {
        Ok(tx) => tx,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.transactions.insert(scope, tx).await {
        Ok(tx) => dto::created(
            "transaction created",
            json!({ "transaction": transaction_json(&tx) }),
        ),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// PUT /transactions/:id - edit fields while still pending.
pub async fn update_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<RequestScope>,
    Path(id): Path<TransactionId>,
    Json(req): Json<dto::UpdateTransactionRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::TRANSACTIONS_EDIT,
        "not allowed to edit transactions",
    ) {
        return resp;
    }

    let mut tx = match load_owned(&services, &principal, id).await {
        Ok(tx) => tx,
        Err(resp) => return resp,
    };

    let cmd = UpdateTransaction {
        origin_amount: req.origin_amount,
        origin_currency: req.origin_currency,
        dest_currency: req.dest_currency,
        rate: req.rate,
        sender_name: req.sender_name,
        receiver_name: req.receiver_name,
        remarks: req.remarks,
    };
    if let Err(e) = tx.update_details(cmd) {
        return errors::domain_error_to_response(e);
    }

    match services.transactions.update(scope, tx).await {
        Ok(tx) => dto::ok(
            "transaction updated",
            json!({ "transaction": transaction_json(&tx) }),
        ),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /transactions/:id/mark-ready
pub async fn mark_ready(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<RequestScope>,
    Path(id): Path<TransactionId>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::TRANSACTIONS_MARK_READY,
        "not allowed to mark transactions ready",
    ) {
        return resp;
    }

    let mut tx = match load_owned(&services, &principal, id).await {
        Ok(tx) => tx,
        Err(resp) => return resp,
    };
    if let Err(e) = tx.mark_ready() {
        return errors::domain_error_to_response(e);
    }

    match services.transactions.update(scope, tx).await {
        Ok(tx) => dto::ok(
            "transaction marked ready",
            json!({ "transaction": transaction_json(&tx) }),
        ),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /transactions/:id/approve
pub async fn approve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<RequestScope>,
    Path(id): Path<TransactionId>,
    Json(req): Json<dto::ApproveRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::TRANSACTIONS_APPROVE,
        "not allowed to approve transactions",
    ) {
        return resp;
    }

    let mut tx = match load_owned(&services, &principal, id).await {
        Ok(tx) => tx,
        Err(resp) => return resp,
    };
    if let Err(e) = tx.approve(req.remarks) {
        return errors::domain_error_to_response(e);
    }

    match services.transactions.update(scope, tx).await {
        Ok(tx) => dto::ok(
            "transaction approved",
            json!({ "transaction": transaction_json(&tx) }),
        ),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /transactions/:id/cancel - irreversible; reason required.
pub async fn cancel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<RequestScope>,
    Path(id): Path<TransactionId>,
    Json(req): Json<dto::ReasonRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::TRANSACTIONS_CANCEL,
        "not allowed to cancel transactions",
    ) {
        return resp;
    }

    let mut tx = match load_owned(&services, &principal, id).await {
        Ok(tx) => tx,
        Err(resp) => return resp,
    };
    if let Err(e) = tx.cancel(&req.reason) {
        return errors::domain_error_to_response(e);
    }

    match services.transactions.update(scope, tx).await {
        Ok(tx) => dto::ok(
            "transaction cancelled",
            json!({ "transaction": transaction_json(&tx) }),
        ),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /transactions/:id/reverse - irreversible; reason required.
pub async fn reverse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<RequestScope>,
    Path(id): Path<TransactionId>,
    Json(req): Json<dto::ReasonRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(
        &principal,
        &permissions::TRANSACTIONS_REVERSE,
        "not allowed to reverse transactions",
    ) {
        return resp;
    }

    let mut tx = match load_owned(&services, &principal, id).await {
        Ok(tx) => tx,
        Err(resp) => return resp,
    };
    if let Err(e) = tx.reverse(&req.reason) {
        return errors::domain_error_to_response(e);
    }

    match services.transactions.update(scope, tx).await {
        Ok(tx) => dto::ok(
            "transaction reversed",
            json!({ "transaction": transaction_json(&tx) }),
        ),
        Err(e) => errors::domain_error_to_response(e),
    }
}
