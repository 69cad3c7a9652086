//! Request/response DTOs and the uniform response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use remitdesk_core::{BeneficiaryId, CustomerId, OrganisationId, RoleId, UserId};
use remitdesk_remit::{ChargeSpec, ChargeType, Direction};

// -------------------------
// Response envelope
// -------------------------

/// Uniform shape of every response body.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<JsonValue>>,
}

pub fn ok(message: impl Into<String>, data: JsonValue) -> Response {
    respond(StatusCode::OK, message, Some(data))
}

pub fn ok_empty(message: impl Into<String>) -> Response {
    respond(StatusCode::OK, message, None)
}

pub fn created(message: impl Into<String>, data: JsonValue) -> Response {
    respond(StatusCode::CREATED, message, Some(data))
}

fn respond(status: StatusCode, message: impl Into<String>, data: Option<JsonValue>) -> Response {
    (
        status,
        axum::Json(Envelope {
            success: true,
            message: message.into(),
            data,
            error: None,
            errors: None,
        }),
    )
        .into_response()
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub organisation_id: OrganisationId,
    pub role_id: RoleId,
}

#[derive(Debug, Deserialize, Default)]
pub struct SeedRequest {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub permission: String,
}

#[derive(Debug, Deserialize)]
pub struct ChargeRequest {
    pub charge_type: ChargeType,
    pub amount: Option<Decimal>,
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub is_reversible: bool,
}

impl From<ChargeRequest> for ChargeSpec {
    fn from(req: ChargeRequest) -> Self {
        ChargeSpec {
            charge_type: req.charge_type,
            amount: req.amount,
            rate: req.rate,
            is_reversible: req.is_reversible,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub direction: Direction,
    pub origin_amount: Decimal,
    pub origin_currency: String,
    pub dest_currency: String,
    pub rate: Decimal,
    pub origin_country: String,
    pub destination_country: String,
    pub customer_id: Option<CustomerId>,
    pub beneficiary_id: Option<BeneficiaryId>,
    pub sender_name: String,
    pub receiver_name: String,
    #[serde(default)]
    pub charges: Vec<ChargeRequest>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    pub origin_amount: Decimal,
    pub origin_currency: String,
    pub dest_currency: String,
    pub rate: Decimal,
    pub sender_name: String,
    pub receiver_name: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApproveRequest {
    pub remarks: Option<String>,
}

/// Cancel and reverse are irreversible; the reason is mandatory and is
/// persisted on the transaction alongside the transition.
#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct AuditQueryParams {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub user_id: Option<UserId>,
    pub organisation_id: Option<OrganisationId>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
