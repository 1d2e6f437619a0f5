use crate::distribution::{AllocationRecord, DistributionRecord, DistributionStatus, PlannedAllocation};
use crate::error::{LedgerResult, StoreError};
use crate::journal::{JournalEntry, Mutation};
use crate::ledger::MemberLedger;
use crate::settlement::{PeriodNumber, SettlementRecord};
use crate::types::{DistributionId, MemberId};

/// Row access to member ledgers.
///
/// Implementations must make [`LedgerStore::update`] indivisible with respect
/// to every other writer of the same row: row lock, conditional update, or an
/// optimistic retry loop. A read followed by an unguarded write is not enough.
pub trait LedgerStore: Send + Sync {
    fn load(&self, member_id: MemberId) -> Result<Option<MemberLedger>, StoreError>;

    /// Returns the row, inserting a zeroed one in `currency` if none exists.
    fn load_or_create(&self, member_id: MemberId, currency: &str) -> Result<MemberLedger, StoreError>;

    /// Replaces the row and stamps `last_updated`. Rejects rows that break the
    /// balance invariants. Not journaled. Only reached through
    /// `BalanceOperator::restore_ledger`, for rows imported from elsewhere.
    fn put(&self, ledger: MemberLedger) -> LedgerResult<MemberLedger>;

    /// Rows ordered by balance, largest first.
    fn list(&self) -> Result<Vec<MemberLedger>, StoreError>;

    /// Atomic read-modify-write of one row. On any error the row and journal
    /// are left untouched.
    fn update(&self, member_id: MemberId, currency: &str, mutation: Mutation) -> LedgerResult<MemberLedger>;

    /// Journal entries for one member, oldest first.
    fn journal(&self, member_id: MemberId) -> Result<Vec<JournalEntry>, StoreError>;
}

pub trait DistributionStore: LedgerStore {
    /// Persists a draft, assigning its id.
    fn create_distribution(&self, draft: DistributionRecord) -> Result<DistributionRecord, StoreError>;

    fn distribution(&self, id: DistributionId) -> Result<Option<DistributionRecord>, StoreError>;

    fn distributions(&self) -> Result<Vec<DistributionRecord>, StoreError>;

    fn set_distribution_status(&self, id: DistributionId, status: DistributionStatus) -> LedgerResult<()>;

    /// Applies a planned allocation to the member's row and records it as one
    /// unit, keyed by `(distribution_id, member_id)`. If the pair is already
    /// recorded the existing allocation is returned and nothing is applied.
    fn apply_allocation(
        &self,
        distribution_id: DistributionId,
        planned: &PlannedAllocation,
        currency: &str,
    ) -> LedgerResult<AllocationRecord>;
}

pub trait SettlementStore: Send + Sync {
    fn max_period_number(&self) -> Result<Option<PeriodNumber>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the period number is taken.
    fn insert_settlement(&self, record: SettlementRecord) -> Result<SettlementRecord, StoreError>;

    /// Newest date first.
    fn settlements(&self, limit: usize, offset: usize) -> Result<Vec<SettlementRecord>, StoreError>;

    fn latest_settlement(&self) -> Result<Option<SettlementRecord>, StoreError>;
}
