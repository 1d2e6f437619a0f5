// 8.3 engine/recorder.rs: settlement recorder. claims the next period number and appends
// the summary. two recorders racing for the same number meet at the store's unique
// constraint; the loser re-reads the maximum and tries again.

use std::sync::Arc;

use chrono::NaiveDate;

use super::retry::with_retries;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult, StoreError};
use crate::settlement::{next_period_number, PeriodNumber, SettlementDraft, SettlementRecord};
use crate::store::SettlementStore;
use crate::types::{Money, Timestamp};

pub struct SettlementRecorder<S> {
    store: Arc<S>,
    config: LedgerConfig,
}

impl<S: SettlementStore> SettlementRecorder<S> {
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn next_period_number(&self) -> LedgerResult<PeriodNumber> {
        let max = with_retries(self.config.persistence_retries, "max_period_number", || {
            Ok(self.store.max_period_number()?)
        })?;
        Ok(next_period_number(max))
    }

    pub fn record_settlement(
        &self,
        date: NaiveDate,
        total_revenue: Money,
        total_expenses: Money,
        notes: impl Into<String>,
    ) -> LedgerResult<SettlementRecord> {
        let draft = SettlementDraft::new(date, total_revenue, total_expenses, notes)?;
        let attempts = self.config.settlement_conflict_retries;

        let mut last_conflict = None;
        for attempt in 1..=attempts {
            let period_number = self.next_period_number()?;
            let record = draft.clone().into_record(period_number, Timestamp::now());

            let inserted = with_retries(self.config.persistence_retries, "insert_settlement", || {
                Ok(self.store.insert_settlement(record.clone())?)
            });

            match inserted {
                Ok(record) => {
                    tracing::info!(
                        period_number = record.period_number,
                        date = %record.date,
                        revenue = %record.total_revenue,
                        expenses = %record.total_expenses,
                        net_profit = %record.net_profit,
                        "settlement recorded"
                    );
                    return Ok(record);
                }
                Err(LedgerError::Persistence(StoreError::Conflict(reason))) => {
                    tracing::warn!(period_number, attempt, reason = %reason, "period number taken, retrying");
                    last_conflict = Some(StoreError::Conflict(reason));
                }
                Err(e) => return Err(e),
            }
        }

        Err(LedgerError::Persistence(last_conflict.unwrap_or_else(|| {
            StoreError::Conflict("no settlement attempts configured".to_string())
        })))
    }

    /// Newest first.
    pub fn history(&self, limit: usize, offset: usize) -> LedgerResult<Vec<SettlementRecord>> {
        with_retries(self.config.persistence_retries, "settlement_history", || {
            Ok(self.store.settlements(limit, offset)?)
        })
    }

    pub fn latest(&self) -> LedgerResult<Option<SettlementRecord>> {
        with_retries(self.config.persistence_retries, "latest_settlement", || {
            Ok(self.store.latest_settlement()?)
        })
    }
}
