//! `remitdesk-remit` — money-transfer transaction domain.
//!
//! The lifecycle module is the single source of truth for which actions are
//! legal in which `(status, remittance_status)` pair; command handlers and
//! any UI reflect it, they never re-derive it.

pub mod lifecycle;
pub mod status;
pub mod transaction;

pub use lifecycle::{allowed_actions, ensure_allowed, StateTransitionError, TransactionAction};
pub use status::{
    ChargeStatus, ChargeType, Direction, RemittanceStatus, RequestStatus, TransactionStatus,
};
pub use transaction::{
    ChargeSpec, Corridor, CreateTransaction, Transaction, TransactionCharge, UpdateTransaction,
};
