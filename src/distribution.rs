// 4.0: profit/loss distribution math. turns a signed profit figure into per-shareholder
// amounts. 4.0 has the records, 4.1+ the pure allocation logic. nothing here touches a store.

use crate::directory::Shareholder;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::MemberLedger;
use crate::types::{DistributionId, MemberId, Money, Shares, Timestamp};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStatus {
    InProgress,
    // stopped partway. applied allocations stand, the rest can be resumed
    Incomplete,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Settled,
    // loss the member could not absorb from available funds. owed, collected out of band
    Unsettled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAllocation {
    pub member_id: MemberId,
    pub shares: Shares,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub distribution_id: DistributionId,
    pub member_id: MemberId,
    pub shares: Shares,
    pub amount: Money,
    pub status: AllocationStatus,
    pub recorded_at: Timestamp,
}

impl AllocationRecord {
    pub fn is_settled(&self) -> bool {
        self.status == AllocationStatus::Settled
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub id: DistributionId,
    pub date: NaiveDate,
    pub total_profit: Money,
    pub total_shares: Shares,
    pub share_unit: Shares,
    pub amount_per_share: Decimal,
    pub amount_per_unit: Decimal,
    pub is_loss: bool,
    pub status: DistributionStatus,
    // the full plan, kept so an interrupted run can be resumed member by member
    pub plan: Vec<PlannedAllocation>,
    pub allocations: Vec<AllocationRecord>,
}

impl DistributionRecord {
    pub fn draft(date: NaiveDate, plan: &AllocationPlan) -> Self {
        Self {
            id: DistributionId(0),
            date,
            total_profit: plan.total_profit,
            total_shares: plan.total_shares,
            share_unit: plan.share_unit,
            amount_per_share: plan.amount_per_share,
            amount_per_unit: plan.amount_per_unit,
            is_loss: plan.is_loss,
            status: DistributionStatus::InProgress,
            plan: plan.allocations.clone(),
            allocations: Vec::new(),
        }
    }

    pub fn allocation_for(&self, member_id: MemberId) -> Option<&AllocationRecord> {
        self.allocations.iter().find(|a| a.member_id == member_id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &PlannedAllocation> {
        self.plan
            .iter()
            .filter(move |p| self.allocation_for(p.member_id).is_none())
    }

    pub fn unsettled(&self) -> impl Iterator<Item = &AllocationRecord> {
        self.allocations.iter().filter(|a| !a.is_settled())
    }

    pub fn summary(&self) -> DistributionSummary {
        let settled_total: Money = self
            .allocations
            .iter()
            .filter(|a| a.is_settled())
            .map(|a| a.amount)
            .sum();
        let unsettled_total: Money = self.unsettled().map(|a| a.amount).sum();

        DistributionSummary {
            distribution_id: self.id,
            status: self.status,
            planned_total: self.plan.iter().map(|p| p.amount).sum(),
            settled_total,
            unsettled_total,
            participants: self.plan.len(),
            unsettled_count: self.unsettled().count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub distribution_id: DistributionId,
    pub status: DistributionStatus,
    pub planned_total: Money,
    pub settled_total: Money,
    pub unsettled_total: Money,
    pub participants: usize,
    pub unsettled_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub total_profit: Money,
    pub total_shares: Shares,
    pub share_unit: Shares,
    pub amount_per_share: Decimal,
    pub amount_per_unit: Decimal,
    pub is_loss: bool,
    pub allocations: Vec<PlannedAllocation>,
}

impl AllocationPlan {
    pub fn total(&self) -> Money {
        self.allocations.iter().map(|a| a.amount).sum()
    }
}

// 4.1: signed. positive is a dividend, negative a required loss contribution
pub fn amount_per_share(total_profit: Money, total_shares: Shares) -> LedgerResult<Decimal> {
    if total_shares.is_zero() {
        return Err(LedgerError::InvalidShareCount { total_shares });
    }
    total_profit
        .value()
        .checked_div(total_shares.value())
        .ok_or(LedgerError::AmountOverflow { operation: "amount_per_share" })
}

// 4.2: amount per smallest tradable unit. 0.5 → half a share
pub fn amount_per_unit(per_share: Decimal, share_unit: Shares) -> LedgerResult<Decimal> {
    per_share
        .checked_mul(share_unit.value())
        .ok_or(LedgerError::AmountOverflow { operation: "amount_per_unit" })
}

fn overflow() -> LedgerError {
    LedgerError::AmountOverflow { operation: "plan_allocations" }
}

/// 4.3: computes every participant's rounded allocation.
///
/// Each `shares * amount_per_share` is rounded half away from zero to
/// `increment`. The rounding drift against the exact target is then pushed onto
/// the largest holder (lowest id on ties), so the plan sums to the target to the
/// last increment. A correction that would flip the largest holder's sign stops
/// at zero and the remainder falls to the next largest. Zero holdings, and
/// holdings whose amount rounds to zero, get no allocation.
///
/// Figures too large for the decimal range fail with `AmountOverflow` before
/// anything is planned.
pub fn plan_allocations(
    total_profit: Money,
    total_shares: Shares,
    share_unit: Shares,
    holders: &[Shareholder],
    increment: Decimal,
) -> LedgerResult<AllocationPlan> {
    let per_share = amount_per_share(total_profit, total_shares)?;
    if share_unit.is_zero() {
        return Err(LedgerError::InvalidShareCount { total_shares: share_unit });
    }
    let per_unit = amount_per_unit(per_share, share_unit)?;

    let participants: Vec<&Shareholder> = holders.iter().filter(|h| !h.shares.is_zero()).collect();
    let allocated_shares = participants
        .iter()
        .try_fold(Decimal::ZERO, |acc, h| acc.checked_add(h.shares.value()))
        .ok_or_else(overflow)?;

    let mut allocations = Vec::with_capacity(participants.len());
    for h in &participants {
        let amount = Money::new(h.shares.value())
            .checked_mul(per_share)
            .and_then(|exact| exact.round_to(increment))
            .ok_or_else(overflow)?;
        allocations.push(PlannedAllocation {
            member_id: h.member_id,
            shares: h.shares,
            amount,
        });
    }

    // computed from the profit directly so 1000 / 3.5 * 3.5 lands on 1000, not 999.99..
    let target = if allocated_shares == total_shares.value() {
        Some(total_profit)
    } else {
        allocated_shares
            .checked_div(total_shares.value())
            .and_then(|fraction| total_profit.checked_mul(fraction))
    }
    .and_then(|target| target.round_to(increment))
    .ok_or_else(overflow)?;

    let rounded = allocations
        .iter()
        .try_fold(Money::zero(), |acc, a| acc.checked_add(a.amount))
        .ok_or_else(overflow)?;
    let mut drift = target.checked_sub(rounded).ok_or_else(overflow)?;
    let mut by_holding: Vec<usize> = (0..allocations.len()).collect();
    by_holding.sort_by(|&a, &b| {
        let (a, b) = (&allocations[a], &allocations[b]);
        b.shares.cmp(&a.shares).then(a.member_id.cmp(&b.member_id))
    });

    for i in by_holding {
        if drift.is_zero() {
            break;
        }
        // a correction never pushes an amount across zero; the rest moves down the list
        let amount = allocations[i].amount;
        let step = if amount.is_zero() || drift.is_negative() == amount.is_negative() || drift.abs() <= amount.abs() {
            drift
        } else {
            amount.negate()
        };
        allocations[i].amount = amount.add(step);
        drift = drift.sub(step);
    }

    allocations.retain(|a| !a.amount.is_zero());

    Ok(AllocationPlan {
        total_profit,
        total_shares,
        share_unit,
        amount_per_share: per_share,
        amount_per_unit: per_unit,
        is_loss: total_profit.is_negative(),
        allocations,
    })
}

/// 4.4: applies one planned allocation to a ledger row. A loss the member cannot
/// cover from available funds is recorded as unsettled and leaves the row as is.
pub fn settle_allocation(
    ledger: &mut MemberLedger,
    planned: &PlannedAllocation,
) -> LedgerResult<AllocationStatus> {
    match ledger.apply_delta(planned.amount) {
        Ok(()) => Ok(AllocationStatus::Settled),
        Err(LedgerError::InsufficientAvailableBalance { .. }) if planned.amount.is_negative() => {
            Ok(AllocationStatus::Unsettled)
        }
        Err(e) => Err(e),
    }
}
