// 10.0: error kinds. business-rule failures carry member/amount context so the caller
// can report them without another lookup. store failures are wrapped, never flattened.

use crate::types::{DistributionId, MemberId, Money, Shares};

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Member {member_id} not found")]
    MemberNotFound { member_id: MemberId },

    #[error("Insufficient available balance for {member_id}: requested {requested}, available {available}")]
    InsufficientAvailableBalance {
        member_id: MemberId,
        requested: Money,
        available: Money,
    },

    #[error("Insufficient frozen balance for {member_id}: requested {requested}, frozen {frozen}")]
    InsufficientFrozenBalance {
        member_id: MemberId,
        requested: Money,
        frozen: Money,
    },

    #[error("Invalid share count {total_shares}: must be positive")]
    InvalidShareCount { total_shares: Shares },

    #[error("Invalid amount {amount}")]
    InvalidAmount { amount: Money },

    #[error("Amount overflow in {operation}")]
    AmountOverflow { operation: &'static str },

    #[error("Transfer of {amount} from {from} to {to} failed ({credit_error}) and the debit was not reversed ({reversal_error})")]
    TransferCompensationFailed {
        from: MemberId,
        to: MemberId,
        amount: Money,
        credit_error: Box<LedgerError>,
        reversal_error: Box<LedgerError>,
    },

    #[error("Allocation of {amount} to {member_id} could not be collected")]
    UnsettledAllocation { member_id: MemberId, amount: Money },

    #[error("Distribution {distribution_id} not found")]
    DistributionNotFound { distribution_id: DistributionId },

    #[error("Distribution {distribution_id} cancelled before all allocations were applied")]
    DistributionCancelled { distribution_id: DistributionId },

    #[error("Invariant violated on {member_id}: {reason}")]
    InvariantViolation { member_id: MemberId, reason: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl LedgerError {
    // only store hiccups are worth retrying. insufficient funds stays insufficient.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Persistence(e) if e.is_transient())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("constraint violated: {0}")]
    Conflict(String),

    #[error("store corrupted: {0}")]
    Corrupted(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
