use serde::{Deserialize, Serialize};

/// Direction of the transfer relative to this organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Approval-workflow status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    PendingApproval,
    Ready,
    Approved,
    Cancelled,
    Reversed,
    Completed,
    Failed,
    Rejected,
}

impl TransactionStatus {
    /// Terminal statuses admit no outbound transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Cancelled
                | TransactionStatus::Reversed
                | TransactionStatus::Completed
                | TransactionStatus::Failed
                | TransactionStatus::Rejected
        )
    }
}

impl core::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::PendingApproval => "PENDING_APPROVAL",
            TransactionStatus::Ready => "READY",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Cancelled => "CANCELLED",
            TransactionStatus::Reversed => "REVERSED",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// Settlement-side status, distinct from the approval workflow.
///
/// Completed/Failed are set by settlement collaborators outside this
/// system; they are modeled so the guards can refuse actions on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemittanceStatus {
    Pending,
    Ready,
    Completed,
    Failed,
}

impl core::fmt::Display for RemittanceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            RemittanceStatus::Pending => "PENDING",
            RemittanceStatus::Ready => "READY",
            RemittanceStatus::Completed => "COMPLETED",
            RemittanceStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Status of an inbound pickup/payout request attached to the transaction.
///
/// Carried as data; the lifecycle table does not guard on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[default]
    Requested,
    Approved,
    Rejected,
}

/// Kind of charge applied to a transaction at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeType {
    Tax,
    InternalFee,
    Commission,
    Other,
}

/// Lifecycle of one charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    #[default]
    Applied,
    Reversed,
}
