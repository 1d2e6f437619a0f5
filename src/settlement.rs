// 5.0 settlement.rs: period summaries. append-only, one record per period, never edited.
// period numbers come from the persisted maximum, not a counter, so they survive restarts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::types::{Money, Timestamp};

// Period number of a settlement, starting at 1
pub type PeriodNumber = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub period_number: PeriodNumber,
    pub date: NaiveDate,
    pub total_revenue: Money,
    pub total_expenses: Money,
    pub net_profit: Money,
    pub notes: String,
    pub recorded_at: Timestamp,
}

// What a caller submits. The period number is assigned at insert time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementDraft {
    pub date: NaiveDate,
    pub total_revenue: Money,
    pub total_expenses: Money,
    pub notes: String,
}

impl SettlementDraft {
    pub fn new(
        date: NaiveDate,
        total_revenue: Money,
        total_expenses: Money,
        notes: impl Into<String>,
    ) -> LedgerResult<Self> {
        for amount in [total_revenue, total_expenses] {
            if amount.is_negative() {
                return Err(LedgerError::InvalidAmount { amount });
            }
        }
        Ok(Self {
            date,
            total_revenue,
            total_expenses,
            notes: notes.into(),
        })
    }

    pub fn net_profit(&self) -> Money {
        self.total_revenue.sub(self.total_expenses)
    }

    pub fn into_record(self, period_number: PeriodNumber, recorded_at: Timestamp) -> SettlementRecord {
        let net_profit = self.net_profit();
        SettlementRecord {
            period_number,
            date: self.date,
            total_revenue: self.total_revenue,
            total_expenses: self.total_expenses,
            net_profit,
            notes: self.notes,
            recorded_at,
        }
    }
}

// max + 1, or 1 on an empty history
pub fn next_period_number(current_max: Option<PeriodNumber>) -> PeriodNumber {
    current_max.map_or(1, |max| max + 1)
}
