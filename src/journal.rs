// 3.0: every successful ledger mutation produces a journal entry. used for statements,
// audit trails and reconciling distribution runs. written by the store in the same
// critical section as the row itself, so the journal never runs ahead of or behind a row.

use crate::ledger::MemberLedger;
use crate::types::{DistributionId, EntryId, MemberId, Money, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    Credit,
    Debit,
    Freeze,
    Unfreeze,
    // manual signed correction outside any distribution
    Adjustment,
    Distribution { distribution_id: DistributionId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub member_id: MemberId,
    pub kind: EntryKind,
    // signed. debits and loss contributions are negative, freezes are positive
    pub amount: Money,
    pub balance_after: Money,
    pub available_after: Money,
    pub frozen_after: Money,
    pub at: Timestamp,
}

impl JournalEntry {
    pub fn record(id: EntryId, kind: EntryKind, amount: Money, after: &MemberLedger) -> Self {
        Self {
            id,
            member_id: after.member_id,
            kind,
            amount,
            balance_after: after.balance,
            available_after: after.available_balance,
            frozen_after: after.frozen_balance,
            at: after.last_updated,
        }
    }
}

// what a caller asked for. the store turns it into a transition and a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub kind: EntryKind,
    pub amount: Money,
}

impl Mutation {
    pub fn credit(amount: Money) -> Self {
        Self { kind: EntryKind::Credit, amount }
    }

    pub fn debit(amount: Money) -> Self {
        Self { kind: EntryKind::Debit, amount }
    }

    pub fn freeze(amount: Money) -> Self {
        Self { kind: EntryKind::Freeze, amount }
    }

    pub fn unfreeze(amount: Money) -> Self {
        Self { kind: EntryKind::Unfreeze, amount }
    }

    pub fn adjustment(delta: Money) -> Self {
        Self { kind: EntryKind::Adjustment, amount: delta }
    }

    pub fn distribution(distribution_id: DistributionId, delta: Money) -> Self {
        Self {
            kind: EntryKind::Distribution { distribution_id },
            amount: delta,
        }
    }

    pub fn apply(&self, ledger: &mut MemberLedger) -> crate::error::LedgerResult<()> {
        match self.kind {
            EntryKind::Credit => ledger.credit(self.amount),
            EntryKind::Debit => ledger.debit(self.amount),
            EntryKind::Freeze => ledger.freeze(self.amount),
            EntryKind::Unfreeze => ledger.unfreeze(self.amount),
            EntryKind::Adjustment | EntryKind::Distribution { .. } => ledger.apply_delta(self.amount),
        }
    }

    // the signed amount as it lands in the journal
    pub fn journal_amount(&self) -> Money {
        match self.kind {
            EntryKind::Debit => self.amount.negate(),
            _ => self.amount,
        }
    }
}
