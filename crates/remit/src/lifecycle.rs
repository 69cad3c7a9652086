//! The transaction lifecycle transition table.
//!
//! One table, checked at the command boundary, returned to clients as the
//! set of permitted actions. Nothing else in the system decides whether an
//! action is legal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use remitdesk_core::DomainError;

use crate::status::{RemittanceStatus, TransactionStatus};

/// Actions that operate on an existing transaction.
///
/// Creation is absent on purpose: it has no current state to guard on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionAction {
    Update,
    MarkReady,
    Approve,
    Cancel,
    Reverse,
}

pub const ALL_ACTIONS: &[TransactionAction] = &[
    TransactionAction::Update,
    TransactionAction::MarkReady,
    TransactionAction::Approve,
    TransactionAction::Cancel,
    TransactionAction::Reverse,
];

impl core::fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            TransactionAction::Update => "update",
            TransactionAction::MarkReady => "mark_ready",
            TransactionAction::Approve => "approve",
            TransactionAction::Cancel => "cancel",
            TransactionAction::Reverse => "reverse",
        };
        f.write_str(s)
    }
}

/// An action was attempted outside its guard.
///
/// Carries the attempted action and the full current state pair so the
/// failure can be explained to a human operator, not just rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("action '{action}' is not allowed while status={status}, remittance_status={remittance_status}")]
pub struct StateTransitionError {
    pub action: TransactionAction,
    pub status: TransactionStatus,
    pub remittance_status: RemittanceStatus,
}

impl From<StateTransitionError> for DomainError {
    fn from(e: StateTransitionError) -> Self {
        DomainError::StateTransition {
            action: e.action.to_string(),
            status: e.status.to_string(),
            remittance_status: e.remittance_status.to_string(),
        }
    }
}

/// Is `action` legal in the compound state `(status, remittance_status)`?
pub fn is_allowed(
    action: TransactionAction,
    status: TransactionStatus,
    remittance_status: RemittanceStatus,
) -> bool {
    use crate::status::RemittanceStatus as R;
    use crate::status::TransactionStatus as S;

    if status.is_terminal() {
        return false;
    }

    match action {
        TransactionAction::Update => {
            matches!(status, S::Pending | S::PendingApproval) && remittance_status == R::Pending
        }
        TransactionAction::MarkReady => matches!(status, S::Pending | S::PendingApproval),
        TransactionAction::Approve => status == S::Ready && remittance_status == R::Ready,
        TransactionAction::Cancel => {
            matches!(status, S::Pending | S::PendingApproval | S::Ready)
                && remittance_status == R::Pending
        }
        TransactionAction::Reverse => {
            status == S::Approved && matches!(remittance_status, R::Ready | R::Pending)
        }
    }
}

/// Guard check returning the violated-guard error for the caller to surface.
pub fn ensure_allowed(
    action: TransactionAction,
    status: TransactionStatus,
    remittance_status: RemittanceStatus,
) -> Result<(), StateTransitionError> {
    if is_allowed(action, status, remittance_status) {
        Ok(())
    } else {
        Err(StateTransitionError {
            action,
            status,
            remittance_status,
        })
    }
}

/// Actions currently permitted - what a client renders as enabled.
pub fn allowed_actions(
    status: TransactionStatus,
    remittance_status: RemittanceStatus,
) -> Vec<TransactionAction> {
    ALL_ACTIONS
        .iter()
        .copied()
        .filter(|a| is_allowed(*a, status, remittance_status))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::RemittanceStatus as R;
    use crate::status::TransactionStatus as S;
    use super::TransactionAction as A;
    use proptest::prelude::*;

    const ALL_STATUSES: &[S] = &[
        S::Pending,
        S::PendingApproval,
        S::Ready,
        S::Approved,
        S::Cancelled,
        S::Reversed,
        S::Completed,
        S::Failed,
        S::Rejected,
    ];

    const ALL_REMITTANCE: &[R] = &[R::Pending, R::Ready, R::Completed, R::Failed];

    #[test]
    fn update_requires_pending_pair() {
        assert!(is_allowed(A::Update, S::Pending, R::Pending));
        assert!(is_allowed(A::Update, S::PendingApproval, R::Pending));
        assert!(!is_allowed(A::Update, S::Pending, R::Ready));
        assert!(!is_allowed(A::Update, S::Ready, R::Pending));
    }

    #[test]
    fn mark_ready_from_either_pending_status() {
        assert!(is_allowed(A::MarkReady, S::Pending, R::Pending));
        assert!(is_allowed(A::MarkReady, S::PendingApproval, R::Ready));
        assert!(!is_allowed(A::MarkReady, S::Ready, R::Ready));
        assert!(!is_allowed(A::MarkReady, S::Approved, R::Ready));
    }

    #[test]
    fn approve_requires_both_sides_ready() {
        assert!(is_allowed(A::Approve, S::Ready, R::Ready));
        assert!(!is_allowed(A::Approve, S::Ready, R::Pending));
        assert!(!is_allowed(A::Approve, S::Pending, R::Ready));
        assert!(!is_allowed(A::Approve, S::Pending, R::Pending));
    }

    #[test]
    fn cancel_only_before_settlement_starts() {
        assert!(is_allowed(A::Cancel, S::Pending, R::Pending));
        assert!(is_allowed(A::Cancel, S::PendingApproval, R::Pending));
        assert!(is_allowed(A::Cancel, S::Ready, R::Pending));
        assert!(!is_allowed(A::Cancel, S::Ready, R::Ready));
        assert!(!is_allowed(A::Cancel, S::Approved, R::Pending));
        assert!(!is_allowed(A::Cancel, S::Pending, R::Completed));
    }

    #[test]
    fn reverse_only_from_approved() {
        assert!(is_allowed(A::Reverse, S::Approved, R::Ready));
        assert!(is_allowed(A::Reverse, S::Approved, R::Pending));
        assert!(!is_allowed(A::Reverse, S::Approved, R::Completed));
        assert!(!is_allowed(A::Reverse, S::Ready, R::Ready));
        assert!(!is_allowed(A::Reverse, S::Reversed, R::Ready));
    }

    #[test]
    fn error_names_action_and_state_pair() {
        let err = ensure_allowed(A::Approve, S::Pending, R::Pending).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("approve"), "{msg}");
        assert!(msg.contains("status=PENDING"), "{msg}");
        assert!(msg.contains("remittance_status=PENDING"), "{msg}");

        let domain: remitdesk_core::DomainError = err.into();
        assert!(matches!(
            domain,
            remitdesk_core::DomainError::StateTransition { .. }
        ));
    }

    proptest! {
        #[test]
        fn terminal_statuses_admit_no_action(
            status_idx in 0usize..ALL_STATUSES.len(),
            remittance_idx in 0usize..ALL_REMITTANCE.len(),
            action_idx in 0usize..ALL_ACTIONS.len(),
        ) {
            let status = ALL_STATUSES[status_idx];
            let remittance = ALL_REMITTANCE[remittance_idx];
            let action = ALL_ACTIONS[action_idx];

            if status.is_terminal() {
                prop_assert!(!is_allowed(action, status, remittance));
            }
        }

        #[test]
        fn allowed_actions_agrees_with_ensure_allowed(
            status_idx in 0usize..ALL_STATUSES.len(),
            remittance_idx in 0usize..ALL_REMITTANCE.len(),
        ) {
            let status = ALL_STATUSES[status_idx];
            let remittance = ALL_REMITTANCE[remittance_idx];
            let allowed = allowed_actions(status, remittance);

            for action in ALL_ACTIONS {
                let expected = allowed.contains(action);
                prop_assert_eq!(ensure_allowed(*action, status, remittance).is_ok(), expected);
            }
        }
    }
}
