// 8.0 engine/core.rs: the fund ledger. one store, one directory, one config, shared by
// the balance operator, distribution engine and settlement recorder.

use std::sync::Arc;

use chrono::NaiveDate;

use super::distributor::{CancelFlag, DistributionEngine};
use super::operator::BalanceOperator;
use super::recorder::SettlementRecorder;
use crate::config::LedgerConfig;
use crate::directory::MemberDirectory;
use crate::distribution::{AllocationPlan, AllocationRecord, DistributionRecord};
use crate::error::LedgerResult;
use crate::journal::JournalEntry;
use crate::ledger::MemberLedger;
use crate::settlement::{PeriodNumber, SettlementRecord};
use crate::store::{DistributionStore, InMemoryStore, SettlementStore};
use crate::types::{DistributionId, MemberId, Money, Shares};

/** 8.1: facade over the three components. cheap to share behind an Arc */
pub struct FundLedger<S> {
    store: Arc<S>,
    operator: BalanceOperator<S>,
    distributor: DistributionEngine<S>,
    recorder: SettlementRecorder<S>,
}

impl FundLedger<InMemoryStore> {
    pub fn in_memory(directory: Arc<dyn MemberDirectory>, config: LedgerConfig) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), directory, config)
    }
}

impl<S: DistributionStore + SettlementStore> FundLedger<S> {
    pub fn new(store: Arc<S>, directory: Arc<dyn MemberDirectory>, config: LedgerConfig) -> Self {
        Self {
            operator: BalanceOperator::new(Arc::clone(&store), Arc::clone(&directory), config.clone()),
            distributor: DistributionEngine::new(Arc::clone(&store), directory, config.clone()),
            recorder: SettlementRecorder::new(Arc::clone(&store), config),
            store,
        }
    }

    /// Raw store access for inspection and recovery tooling. Row writes made
    /// here bypass member checks and logging; use the operator methods.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        self.operator.config()
    }

    pub fn operator(&self) -> &BalanceOperator<S> {
        &self.operator
    }

    pub fn distributor(&self) -> &DistributionEngine<S> {
        &self.distributor
    }

    pub fn recorder(&self) -> &SettlementRecorder<S> {
        &self.recorder
    }

    // 8.2: balances

    pub fn get_ledger(&self, member_id: MemberId) -> LedgerResult<MemberLedger> {
        self.operator.get_ledger(member_id)
    }

    pub fn list_ledgers(&self) -> LedgerResult<Vec<MemberLedger>> {
        self.operator.list_ledgers()
    }

    pub fn journal(&self, member_id: MemberId) -> LedgerResult<Vec<JournalEntry>> {
        self.operator.journal(member_id)
    }

    pub fn credit(&self, member_id: MemberId, amount: Money) -> LedgerResult<MemberLedger> {
        self.operator.credit(member_id, amount)
    }

    pub fn debit(&self, member_id: MemberId, amount: Money) -> LedgerResult<MemberLedger> {
        self.operator.debit(member_id, amount)
    }

    pub fn freeze(&self, member_id: MemberId, amount: Money) -> LedgerResult<MemberLedger> {
        self.operator.freeze(member_id, amount)
    }

    pub fn unfreeze(&self, member_id: MemberId, amount: Money) -> LedgerResult<MemberLedger> {
        self.operator.unfreeze(member_id, amount)
    }

    pub fn apply_delta(&self, member_id: MemberId, delta: Money) -> LedgerResult<MemberLedger> {
        self.operator.apply_delta(member_id, delta)
    }

    pub fn restore_ledger(&self, ledger: MemberLedger) -> LedgerResult<MemberLedger> {
        self.operator.restore_ledger(ledger)
    }

    pub fn transfer(
        &self,
        from: MemberId,
        to: MemberId,
        amount: Money,
    ) -> LedgerResult<(MemberLedger, MemberLedger)> {
        self.operator.transfer(from, to, amount)
    }

    // 8.3: distributions

    pub fn plan_distribution(
        &self,
        total_profit: Money,
        total_shares: Shares,
        share_unit: Option<Shares>,
    ) -> LedgerResult<AllocationPlan> {
        self.distributor.plan(total_profit, total_shares, share_unit)
    }

    pub fn run_distribution(
        &self,
        total_profit: Money,
        total_shares: Shares,
        share_unit: Option<Shares>,
        date: NaiveDate,
    ) -> LedgerResult<DistributionRecord> {
        self.distributor
            .run_distribution(total_profit, total_shares, share_unit, date)
    }

    pub fn run_from_latest_settlement(
        &self,
        share_unit: Option<Shares>,
        date: NaiveDate,
    ) -> LedgerResult<Option<DistributionRecord>> {
        self.distributor.run_from_latest_settlement(share_unit, date)
    }

    pub fn resume_distribution(&self, distribution_id: DistributionId) -> LedgerResult<DistributionRecord> {
        self.distributor.resume(distribution_id, &CancelFlag::new())
    }

    pub fn distribution(&self, distribution_id: DistributionId) -> LedgerResult<DistributionRecord> {
        self.distributor.distribution(distribution_id)
    }

    pub fn distribution_history(&self) -> LedgerResult<Vec<DistributionRecord>> {
        self.distributor.history()
    }

    pub fn unsettled_allocations(&self, distribution_id: DistributionId) -> LedgerResult<Vec<AllocationRecord>> {
        self.distributor.unsettled(distribution_id)
    }

    // 8.4: settlements

    pub fn next_period_number(&self) -> LedgerResult<PeriodNumber> {
        self.recorder.next_period_number()
    }

    pub fn record_settlement(
        &self,
        date: NaiveDate,
        total_revenue: Money,
        total_expenses: Money,
        notes: impl Into<String>,
    ) -> LedgerResult<SettlementRecord> {
        self.recorder
            .record_settlement(date, total_revenue, total_expenses, notes)
    }

    pub fn settlement_history(&self, limit: usize, offset: usize) -> LedgerResult<Vec<SettlementRecord>> {
        self.recorder.history(limit, offset)
    }

    pub fn latest_settlement(&self) -> LedgerResult<Option<SettlementRecord>> {
        self.recorder.latest()
    }
}
