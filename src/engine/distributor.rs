// 8.2 engine/distributor.rs: runs a profit/loss distribution across shareholders.
// plan first (pure), persist the plan, then apply one member at a time. each member's
// delta and allocation row land together, so a run can stop anywhere and be resumed.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;

use super::retry::with_retries;
use crate::config::LedgerConfig;
use crate::directory::MemberDirectory;
use crate::distribution::{
    plan_allocations, AllocationPlan, AllocationRecord, DistributionRecord, DistributionStatus,
};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{DistributionStore, SettlementStore};
use crate::types::{DistributionId, Money, Shares};

/// Checked between shareholders. Allocations already applied when it trips stand.
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
    clear_checks: Option<AtomicU32>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips on its own once `checks` checks have come back clear, so a run
    /// applies at most that many allocations before stopping.
    pub fn after_checks(checks: u32) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            clear_checks: Some(AtomicU32::new(checks)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        if let Some(left) = &self.clear_checks {
            let spent = left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err();
            if spent {
                self.cancel();
                return true;
            }
        }
        false
    }
}

pub struct DistributionEngine<S> {
    store: Arc<S>,
    directory: Arc<dyn MemberDirectory>,
    config: LedgerConfig,
}

impl<S: DistributionStore> DistributionEngine<S> {
    pub fn new(store: Arc<S>, directory: Arc<dyn MemberDirectory>, config: LedgerConfig) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    /// Allocation preview against the current shareholder list. Touches nothing.
    pub fn plan(
        &self,
        total_profit: Money,
        total_shares: Shares,
        share_unit: Option<Shares>,
    ) -> LedgerResult<AllocationPlan> {
        plan_allocations(
            total_profit,
            total_shares,
            share_unit.unwrap_or(self.config.default_share_unit),
            &self.directory.shareholders(),
            self.config.currency_increment,
        )
    }

    pub fn run_distribution(
        &self,
        total_profit: Money,
        total_shares: Shares,
        share_unit: Option<Shares>,
        date: NaiveDate,
    ) -> LedgerResult<DistributionRecord> {
        self.run_with_cancel(total_profit, total_shares, share_unit, date, &CancelFlag::new())
    }

    pub fn run_with_cancel(
        &self,
        total_profit: Money,
        total_shares: Shares,
        share_unit: Option<Shares>,
        date: NaiveDate,
        cancel: &CancelFlag,
    ) -> LedgerResult<DistributionRecord> {
        let plan = self.plan(total_profit, total_shares, share_unit)?;
        let draft = DistributionRecord::draft(date, &plan);
        let record = with_retries(self.config.persistence_retries, "create_distribution", || {
            Ok(self.store.create_distribution(draft.clone())?)
        })?;

        tracing::info!(
            distribution_id = %record.id,
            total_profit = %total_profit,
            total_shares = %total_shares,
            amount_per_share = %record.amount_per_share,
            is_loss = record.is_loss,
            participants = record.plan.len(),
            "distribution started"
        );

        self.apply_pending(record.id, cancel)
    }

    /// Finishes an interrupted run. Members already recorded are skipped.
    pub fn resume(&self, distribution_id: DistributionId, cancel: &CancelFlag) -> LedgerResult<DistributionRecord> {
        let record = self.distribution(distribution_id)?;
        if record.status == DistributionStatus::Complete {
            return Ok(record);
        }

        tracing::info!(
            distribution_id = %distribution_id,
            pending = record.pending().count(),
            "resuming distribution"
        );
        if record.status != DistributionStatus::InProgress {
            self.set_status(distribution_id, DistributionStatus::InProgress)?;
        }
        self.apply_pending(distribution_id, cancel)
    }

    pub fn distribution(&self, distribution_id: DistributionId) -> LedgerResult<DistributionRecord> {
        with_retries(self.config.persistence_retries, "load_distribution", || {
            Ok(self.store.distribution(distribution_id)?)
        })?
        .ok_or(LedgerError::DistributionNotFound { distribution_id })
    }

    pub fn history(&self) -> LedgerResult<Vec<DistributionRecord>> {
        with_retries(self.config.persistence_retries, "list_distributions", || {
            Ok(self.store.distributions()?)
        })
    }

    /// Loss allocations still owed by members who could not absorb them.
    pub fn unsettled(&self, distribution_id: DistributionId) -> LedgerResult<Vec<AllocationRecord>> {
        Ok(self.distribution(distribution_id)?.unsettled().cloned().collect())
    }

    fn apply_pending(&self, distribution_id: DistributionId, cancel: &CancelFlag) -> LedgerResult<DistributionRecord> {
        let record = self.distribution(distribution_id)?;
        let pending: Vec<_> = record.pending().copied().collect();

        for planned in &pending {
            if cancel.is_cancelled() {
                tracing::warn!(distribution_id = %distribution_id, "distribution cancelled");
                self.mark_incomplete(distribution_id);
                return Err(LedgerError::DistributionCancelled { distribution_id });
            }

            let applied = with_retries(self.config.persistence_retries, "apply_allocation", || {
                self.store
                    .apply_allocation(distribution_id, planned, &self.config.currency)
            });

            match applied {
                Ok(allocation) if !allocation.is_settled() => {
                    let owed = LedgerError::UnsettledAllocation {
                        member_id: allocation.member_id,
                        amount: allocation.amount,
                    };
                    tracing::warn!(distribution_id = %distribution_id, error = %owed, "allocation recorded as unsettled");
                }
                Ok(allocation) => tracing::debug!(
                    distribution_id = %distribution_id,
                    member_id = %allocation.member_id,
                    amount = %allocation.amount,
                    "allocation applied"
                ),
                Err(e) => {
                    tracing::error!(
                        distribution_id = %distribution_id,
                        member_id = %planned.member_id,
                        error = %e,
                        "allocation failed, distribution left incomplete"
                    );
                    self.mark_incomplete(distribution_id);
                    return Err(e);
                }
            }
        }

        self.set_status(distribution_id, DistributionStatus::Complete)?;
        let record = self.distribution(distribution_id)?;
        let summary = record.summary();
        tracing::info!(
            distribution_id = %distribution_id,
            settled = %summary.settled_total,
            unsettled = %summary.unsettled_total,
            unsettled_count = summary.unsettled_count,
            "distribution complete"
        );
        Ok(record)
    }

    fn set_status(&self, distribution_id: DistributionId, status: DistributionStatus) -> LedgerResult<()> {
        with_retries(self.config.persistence_retries, "set_distribution_status", || {
            self.store.set_distribution_status(distribution_id, status)
        })
    }

    // best effort. an InProgress record left behind is resumable all the same
    fn mark_incomplete(&self, distribution_id: DistributionId) {
        if let Err(e) = self.set_status(distribution_id, DistributionStatus::Incomplete) {
            tracing::error!(distribution_id = %distribution_id, error = %e, "could not mark distribution incomplete");
        }
    }
}

impl<S: DistributionStore + SettlementStore> DistributionEngine<S> {
    /// Automatic mode: distributes the latest settlement's net profit over the
    /// directory's current total holding.
    pub fn run_from_latest_settlement(
        &self,
        share_unit: Option<Shares>,
        date: NaiveDate,
    ) -> LedgerResult<Option<DistributionRecord>> {
        let latest = with_retries(self.config.persistence_retries, "latest_settlement", || {
            Ok(self.store.latest_settlement()?)
        })?;
        let Some(settlement) = latest else {
            tracing::info!("no settlement recorded, nothing to distribute");
            return Ok(None);
        };

        let total_shares = self.directory.total_shares();
        tracing::info!(
            period_number = settlement.period_number,
            net_profit = %settlement.net_profit,
            total_shares = %total_shares,
            "distributing latest settlement"
        );
        self.run_distribution(settlement.net_profit, total_shares, share_unit, date)
            .map(Some)
    }
}
