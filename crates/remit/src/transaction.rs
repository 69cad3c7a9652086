use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use remitdesk_audit::Audited;
use remitdesk_core::{
    money::{round2, Amount},
    BeneficiaryId, CustomerId, DomainError, DomainResult, Entity, OrganisationId, TransactionId,
    UserId, ValueObject,
};

use crate::lifecycle::{ensure_allowed, TransactionAction};
use crate::status::{
    ChargeStatus, ChargeType, Direction, RemittanceStatus, RequestStatus, TransactionStatus,
};

/// Origin/destination country pair the transfer moves across.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corridor {
    pub origin_country: String,
    pub destination_country: String,
}

impl ValueObject for Corridor {}

impl Corridor {
    pub fn new(
        origin_country: impl Into<String>,
        destination_country: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let origin_country = origin_country.into().to_ascii_uppercase();
        let destination_country = destination_country.into().to_ascii_uppercase();
        for code in [&origin_country, &destination_country] {
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(DomainError::validation(format!(
                    "country must be a 2-letter ISO code, got '{code}'"
                )));
            }
        }
        Ok(Self {
            origin_country,
            destination_country,
        })
    }
}

/// Charge as requested at creation time; amounts are resolved against the
/// origin amount exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeSpec {
    pub charge_type: ChargeType,
    /// Fixed amount in origin currency; mutually exclusive with `rate`.
    pub amount: Option<Decimal>,
    /// Fraction of the origin amount (e.g. 0.015 for 1.5%).
    pub rate: Option<Decimal>,
    pub is_reversible: bool,
}

/// A charge owned by exactly one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCharge {
    pub charge_type: ChargeType,
    pub amount: Decimal,
    pub rate: Option<Decimal>,
    pub is_reversible: bool,
    pub status: ChargeStatus,
}

impl TransactionCharge {
    fn compute(spec: &ChargeSpec, origin_amount: Decimal) -> DomainResult<Self> {
        let amount = match (spec.amount, spec.rate) {
            (Some(amount), None) => {
                if amount < Decimal::ZERO {
                    return Err(DomainError::validation("charge amount must not be negative"));
                }
                round2(amount)
            }
            (None, Some(rate)) => {
                if rate < Decimal::ZERO {
                    return Err(DomainError::validation("charge rate must not be negative"));
                }
                round2(origin_amount * rate)
            }
            _ => {
                return Err(DomainError::validation(
                    "charge needs exactly one of amount or rate",
                ));
            }
        };
        Ok(Self {
            charge_type: spec.charge_type,
            amount,
            rate: spec.rate,
            is_reversible: spec.is_reversible,
            status: ChargeStatus::Applied,
        })
    }
}

/// Command: create a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub organisation_id: OrganisationId,
    pub direction: Direction,
    pub origin_amount: Decimal,
    pub origin_currency: String,
    pub dest_currency: String,
    pub rate: Decimal,
    pub corridor: Corridor,
    pub customer_id: Option<CustomerId>,
    pub beneficiary_id: Option<BeneficiaryId>,
    pub sender_name: String,
    pub receiver_name: String,
    pub charges: Vec<ChargeSpec>,
    pub remarks: Option<String>,
    pub created_by: Option<UserId>,
}

/// Command: replace the editable fields of a pending transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTransaction {
    pub origin_amount: Decimal,
    pub origin_currency: String,
    pub dest_currency: String,
    pub rate: Decimal,
    pub sender_name: String,
    pub receiver_name: String,
    pub remarks: Option<String>,
}

/// A money-transfer transaction.
///
/// `status` and `remittance_status` together form the compound lifecycle
/// state; every command handler goes through [`crate::lifecycle`] before
/// touching either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub organisation_id: OrganisationId,
    pub direction: Direction,
    pub status: TransactionStatus,
    pub remittance_status: RemittanceStatus,
    pub request_status: RequestStatus,
    pub origin_amount: Decimal,
    pub origin_currency: String,
    pub dest_amount: Decimal,
    pub dest_currency: String,
    pub rate: Decimal,
    pub corridor: Corridor,
    pub customer_id: Option<CustomerId>,
    pub beneficiary_id: Option<BeneficiaryId>,
    pub sender_name: String,
    pub receiver_name: String,
    pub charges: Vec<TransactionCharge>,
    pub remarks: Option<String>,
    /// Caller-supplied reason for the most recent irreversible action.
    pub status_reason: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by the store on every write.
    pub version: u64,
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Audited for Transaction {
    const ENTITY_TYPE: &'static str = "transaction";

    fn tracked_fields() -> &'static [&'static str] {
        &[
            "status",
            "remittance_status",
            "request_status",
            "origin_amount",
            "dest_amount",
            "rate",
            "sender_name",
            "receiver_name",
            "remarks",
            "status_reason",
        ]
    }

    fn display_id(id: &Self::Id) -> String {
        id.to_string()
    }
}

impl Transaction {
    /// Create a transaction with charges computed exactly once.
    ///
    /// `needs_review` routes creation into the approval queue
    /// (`PendingApproval`) instead of the normal `Pending` entry status;
    /// both behave identically in every guard.
    pub fn create(cmd: CreateTransaction, needs_review: bool) -> DomainResult<Self> {
        let origin = Amount::new(cmd.origin_amount, cmd.origin_currency)?;
        if origin.value == Decimal::ZERO {
            return Err(DomainError::validation("origin_amount must be positive"));
        }
        let dest = origin.convert(cmd.rate, cmd.dest_currency)?;

        if cmd.sender_name.trim().is_empty() {
            return Err(DomainError::validation("sender_name must not be empty"));
        }
        if cmd.receiver_name.trim().is_empty() {
            return Err(DomainError::validation("receiver_name must not be empty"));
        }

        let charges = cmd
            .charges
            .iter()
            .map(|spec| TransactionCharge::compute(spec, origin.value))
            .collect::<DomainResult<Vec<_>>>()?;

        let now = Utc::now();
        Ok(Self {
            id: TransactionId::new(),
            organisation_id: cmd.organisation_id,
            direction: cmd.direction,
            status: if needs_review {
                TransactionStatus::PendingApproval
            } else {
                TransactionStatus::Pending
            },
            remittance_status: RemittanceStatus::Pending,
            request_status: RequestStatus::default(),
            origin_amount: origin.value,
            origin_currency: origin.currency,
            dest_amount: dest.value,
            dest_currency: dest.currency,
            rate: cmd.rate,
            corridor: cmd.corridor,
            customer_id: cmd.customer_id,
            beneficiary_id: cmd.beneficiary_id,
            sender_name: cmd.sender_name,
            receiver_name: cmd.receiver_name,
            charges,
            remarks: cmd.remarks,
            status_reason: None,
            created_by: cmd.created_by,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Replace editable fields. Charges are computed at creation and are
    /// deliberately not recomputed here.
    pub fn update_details(&mut self, cmd: UpdateTransaction) -> DomainResult<()> {
        ensure_allowed(
            TransactionAction::Update,
            self.status,
            self.remittance_status,
        )?;

        let origin = Amount::new(cmd.origin_amount, cmd.origin_currency)?;
        if origin.value == Decimal::ZERO {
            return Err(DomainError::validation("origin_amount must be positive"));
        }
        let dest = origin.convert(cmd.rate, cmd.dest_currency)?;

        if cmd.sender_name.trim().is_empty() {
            return Err(DomainError::validation("sender_name must not be empty"));
        }
        if cmd.receiver_name.trim().is_empty() {
            return Err(DomainError::validation("receiver_name must not be empty"));
        }

        self.origin_amount = origin.value;
        self.origin_currency = origin.currency;
        self.dest_amount = dest.value;
        self.dest_currency = dest.currency;
        self.rate = cmd.rate;
        self.sender_name = cmd.sender_name;
        self.receiver_name = cmd.receiver_name;
        self.remarks = cmd.remarks;
        self.touch();
        Ok(())
    }

    /// Mark the transaction ready for approval. Staging the funds also
    /// readies the settlement side when it has not started yet.
    pub fn mark_ready(&mut self) -> DomainResult<()> {
        ensure_allowed(
            TransactionAction::MarkReady,
            self.status,
            self.remittance_status,
        )?;
        self.status = TransactionStatus::Ready;
        if self.remittance_status == RemittanceStatus::Pending {
            self.remittance_status = RemittanceStatus::Ready;
        }
        self.touch();
        Ok(())
    }

    pub fn approve(&mut self, remarks: Option<String>) -> DomainResult<()> {
        ensure_allowed(
            TransactionAction::Approve,
            self.status,
            self.remittance_status,
        )?;
        self.status = TransactionStatus::Approved;
        if remarks.is_some() {
            self.remarks = remarks;
        }
        self.touch();
        Ok(())
    }

    /// Cancel before settlement starts. Irreversible; requires a reason.
    pub fn cancel(&mut self, reason: &str) -> DomainResult<()> {
        ensure_allowed(
            TransactionAction::Cancel,
            self.status,
            self.remittance_status,
        )?;
        if reason.trim().is_empty() {
            return Err(DomainError::validation("cancel requires a reason"));
        }
        self.status = TransactionStatus::Cancelled;
        self.status_reason = Some(reason.trim().to_string());
        self.touch();
        Ok(())
    }

    /// Reverse an approved transaction. Irreversible; requires a reason.
    /// Flips only charges flagged reversible.
    pub fn reverse(&mut self, reason: &str) -> DomainResult<()> {
        ensure_allowed(
            TransactionAction::Reverse,
            self.status,
            self.remittance_status,
        )?;
        if reason.trim().is_empty() {
            return Err(DomainError::validation("reverse requires a reason"));
        }
        self.status = TransactionStatus::Reversed;
        self.status_reason = Some(reason.trim().to_string());
        for charge in &mut self.charges {
            if charge.is_reversible {
                charge.status = ChargeStatus::Reversed;
            }
        }
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::allowed_actions;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn create_cmd() -> CreateTransaction {
        CreateTransaction {
            organisation_id: OrganisationId::new(),
            direction: Direction::Outbound,
            origin_amount: dec("100"),
            origin_currency: "USD".to_string(),
            dest_currency: "PHP".to_string(),
            rate: dec("1.2"),
            corridor: Corridor::new("US", "PH").unwrap(),
            customer_id: Some(CustomerId::new()),
            beneficiary_id: Some(BeneficiaryId::new()),
            sender_name: "Ana Cruz".to_string(),
            receiver_name: "Ben Cruz".to_string(),
            charges: vec![
                ChargeSpec {
                    charge_type: ChargeType::Commission,
                    amount: None,
                    rate: Some(dec("0.015")),
                    is_reversible: true,
                },
                ChargeSpec {
                    charge_type: ChargeType::Tax,
                    amount: Some(dec("2.50")),
                    rate: None,
                    is_reversible: false,
                },
            ],
            remarks: None,
            created_by: Some(UserId::new()),
        }
    }

    #[test]
    fn create_computes_dest_amount_and_charges_once() {
        let tx = Transaction::create(create_cmd(), false).unwrap();

        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.remittance_status, RemittanceStatus::Pending);
        assert_eq!(tx.dest_amount, dec("120.00"));
        assert_eq!(tx.dest_currency, "PHP");

        assert_eq!(tx.charges.len(), 2);
        assert_eq!(tx.charges[0].amount, dec("1.50"));
        assert_eq!(tx.charges[0].status, ChargeStatus::Applied);
        assert_eq!(tx.charges[1].amount, dec("2.50"));
    }

    #[test]
    fn create_with_review_lands_in_pending_approval() {
        let tx = Transaction::create(create_cmd(), true).unwrap();
        assert_eq!(tx.status, TransactionStatus::PendingApproval);
        // Same guards apply from either entry status.
        assert!(allowed_actions(tx.status, tx.remittance_status)
            .contains(&TransactionAction::MarkReady));
    }

    #[test]
    fn create_rejects_zero_amount_and_bad_charge_specs() {
        let mut cmd = create_cmd();
        cmd.origin_amount = dec("0");
        assert!(Transaction::create(cmd, false).is_err());

        let mut cmd = create_cmd();
        cmd.charges = vec![ChargeSpec {
            charge_type: ChargeType::Other,
            amount: Some(dec("1")),
            rate: Some(dec("0.01")),
            is_reversible: false,
        }];
        assert!(Transaction::create(cmd, false).is_err());
    }

    #[test]
    fn update_replaces_fields_but_not_charges() {
        let mut tx = Transaction::create(create_cmd(), false).unwrap();
        let charges_before = tx.charges.clone();

        tx.update_details(UpdateTransaction {
            origin_amount: dec("200"),
            origin_currency: "USD".to_string(),
            dest_currency: "PHP".to_string(),
            rate: dec("1.1"),
            sender_name: "Ana Cruz".to_string(),
            receiver_name: "Carl Cruz".to_string(),
            remarks: Some("resend".to_string()),
        })
        .unwrap();

        assert_eq!(tx.dest_amount, dec("220.00"));
        assert_eq!(tx.receiver_name, "Carl Cruz");
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.charges, charges_before);
    }

    #[test]
    fn mark_ready_stages_both_sides() {
        let mut tx = Transaction::create(create_cmd(), false).unwrap();
        tx.mark_ready().unwrap();
        assert_eq!(tx.status, TransactionStatus::Ready);
        assert_eq!(tx.remittance_status, RemittanceStatus::Ready);
    }

    #[test]
    fn update_is_rejected_once_ready() {
        let mut tx = Transaction::create(create_cmd(), false).unwrap();
        tx.mark_ready().unwrap();

        let err = tx
            .update_details(UpdateTransaction {
                origin_amount: dec("200"),
                origin_currency: "USD".to_string(),
                dest_currency: "PHP".to_string(),
                rate: dec("1.1"),
                sender_name: "Ana Cruz".to_string(),
                receiver_name: "Ben Cruz".to_string(),
                remarks: None,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::StateTransition { .. }));
    }

    #[test]
    fn approve_requires_remittance_ready() {
        // Settlement side forced back to pending: approval must wait.
        let mut tx = Transaction::create(create_cmd(), false).unwrap();
        tx.mark_ready().unwrap();
        tx.remittance_status = RemittanceStatus::Pending;
        let err = tx.approve(Some("ok".to_string())).unwrap_err();
        assert!(matches!(err, DomainError::StateTransition { .. }));

        tx.remittance_status = RemittanceStatus::Ready;
        tx.approve(Some("ok".to_string())).unwrap();
        assert_eq!(tx.status, TransactionStatus::Approved);
        assert_eq!(tx.remarks.as_deref(), Some("ok"));
    }

    #[test]
    fn cancel_is_still_possible_while_ready_if_settlement_never_started() {
        let mut tx = Transaction::create(create_cmd(), false).unwrap();
        tx.status = TransactionStatus::Ready;
        assert_eq!(tx.remittance_status, RemittanceStatus::Pending);
        tx.cancel("operator abort").unwrap();
        assert_eq!(tx.status, TransactionStatus::Cancelled);
    }

    #[test]
    fn approve_straight_from_pending_fails() {
        let mut tx = Transaction::create(create_cmd(), false).unwrap();
        let err = tx.approve(None).unwrap_err();
        assert!(matches!(err, DomainError::StateTransition { .. }));
    }

    #[test]
    fn cancel_requires_reason_and_pending_settlement() {
        let mut tx = Transaction::create(create_cmd(), false).unwrap();
        assert!(matches!(
            tx.cancel("  ").unwrap_err(),
            DomainError::Validation(_)
        ));

        tx.cancel("customer changed their mind").unwrap();
        assert_eq!(tx.status, TransactionStatus::Cancelled);
        assert_eq!(
            tx.status_reason.as_deref(),
            Some("customer changed their mind")
        );

        let mut tx = Transaction::create(create_cmd(), false).unwrap();
        tx.remittance_status = RemittanceStatus::Completed;
        assert!(matches!(
            tx.cancel("too late").unwrap_err(),
            DomainError::StateTransition { .. }
        ));
    }

    #[test]
    fn reverse_flips_only_reversible_charges_and_is_terminal() {
        let mut tx = Transaction::create(create_cmd(), false).unwrap();
        tx.mark_ready().unwrap();
        tx.remittance_status = RemittanceStatus::Ready;
        tx.approve(None).unwrap();

        tx.reverse("duplicate").unwrap();
        assert_eq!(tx.status, TransactionStatus::Reversed);
        assert_eq!(tx.charges[0].status, ChargeStatus::Reversed);
        assert_eq!(tx.charges[1].status, ChargeStatus::Applied);

        // Terminal: a second reverse names the violated guard.
        let err = tx.reverse("again").unwrap_err();
        assert!(matches!(err, DomainError::StateTransition { .. }));
    }

    #[test]
    fn reverse_before_approval_fails() {
        let mut tx = Transaction::create(create_cmd(), false).unwrap();
        assert!(matches!(
            tx.reverse("oops").unwrap_err(),
            DomainError::StateTransition { .. }
        ));
    }

    #[test]
    fn status_snapshot_serializes_screaming_case() {
        let tx = Transaction::create(create_cmd(), false).unwrap();
        let snap = serde_json::to_value(&tx).unwrap();
        assert_eq!(snap["status"], "PENDING");
        assert_eq!(snap["remittance_status"], "PENDING");
        assert_eq!(snap["direction"], "OUTBOUND");
    }
}
