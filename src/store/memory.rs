use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::traits::{DistributionStore, LedgerStore, SettlementStore};
use crate::distribution::{
    settle_allocation, AllocationRecord, AllocationStatus, DistributionRecord, DistributionStatus,
    PlannedAllocation,
};
use crate::error::{LedgerError, LedgerResult, StoreError};
use crate::journal::{EntryKind, JournalEntry, Mutation};
use crate::ledger::MemberLedger;
use crate::settlement::{PeriodNumber, SettlementRecord};
use crate::types::{DistributionId, EntryId, MemberId, Timestamp};

#[derive(Debug)]
struct Row {
    ledger: MemberLedger,
    journal: Vec<JournalEntry>,
}

/// In-memory store with one mutex per ledger row.
///
/// The outer `RwLock` only guards row creation; updates to different members
/// never contend. Lock order is row, then distributions.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rows: RwLock<HashMap<MemberId, Arc<Mutex<Row>>>>,
    distributions: Mutex<BTreeMap<DistributionId, DistributionRecord>>,
    settlements: Mutex<Vec<SettlementRecord>>,
    next_entry_id: AtomicU64,
    next_distribution_id: AtomicU64,
    failing_writes: AtomicU32,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Corrupted("lock poisoned".to_string())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` writes fail with [`StoreError::Unavailable`] before
    /// touching any state.
    pub fn fail_next_writes(&self, n: u32) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    fn take_fault(&self) -> Result<(), StoreError> {
        let tripped = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }

    fn entry_id(&self) -> EntryId {
        EntryId(self.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn existing_row(&self, member_id: MemberId) -> Result<Option<Arc<Mutex<Row>>>, StoreError> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows.get(&member_id).cloned())
    }

    fn row(&self, member_id: MemberId, currency: &str) -> Result<Arc<Mutex<Row>>, StoreError> {
        if let Some(row) = self.existing_row(member_id)? {
            return Ok(row);
        }
        let mut rows = self.rows.write().map_err(poisoned)?;
        let row = rows.entry(member_id).or_insert_with(|| {
            Arc::new(Mutex::new(Row {
                ledger: MemberLedger::new(member_id, currency, Timestamp::now()),
                journal: Vec::new(),
            }))
        });
        Ok(Arc::clone(row))
    }
}

impl LedgerStore for InMemoryStore {
    fn load(&self, member_id: MemberId) -> Result<Option<MemberLedger>, StoreError> {
        match self.existing_row(member_id)? {
            Some(cell) => {
                let row = cell.lock().map_err(poisoned)?;
                Ok(Some(row.ledger.clone()))
            }
            None => Ok(None),
        }
    }

    fn load_or_create(&self, member_id: MemberId, currency: &str) -> Result<MemberLedger, StoreError> {
        let cell = self.row(member_id, currency)?;
        let row = cell.lock().map_err(poisoned)?;
        Ok(row.ledger.clone())
    }

    fn put(&self, mut ledger: MemberLedger) -> LedgerResult<MemberLedger> {
        self.take_fault()?;
        ledger.check_invariants()?;
        ledger.last_updated = Timestamp::now();

        let cell = self.row(ledger.member_id, &ledger.currency)?;
        let mut row = cell.lock().map_err(poisoned)?;
        row.ledger = ledger.clone();
        Ok(ledger)
    }

    fn list(&self) -> Result<Vec<MemberLedger>, StoreError> {
        let cells: Vec<Arc<Mutex<Row>>> = {
            let rows = self.rows.read().map_err(poisoned)?;
            rows.values().cloned().collect()
        };

        let mut ledgers = Vec::with_capacity(cells.len());
        for cell in cells {
            ledgers.push(cell.lock().map_err(poisoned)?.ledger.clone());
        }
        ledgers.sort_by(|a, b| b.balance.cmp(&a.balance).then(a.member_id.cmp(&b.member_id)));
        Ok(ledgers)
    }

    fn update(&self, member_id: MemberId, currency: &str, mutation: Mutation) -> LedgerResult<MemberLedger> {
        self.take_fault()?;
        let cell = self.row(member_id, currency)?;
        let mut row = cell.lock().map_err(poisoned)?;

        // transition a copy; the row is only replaced once it checks out
        let mut next = row.ledger.clone();
        mutation.apply(&mut next)?;
        next.check_invariants()?;
        next.last_updated = Timestamp::now();

        let entry = JournalEntry::record(self.entry_id(), mutation.kind, mutation.journal_amount(), &next);
        row.ledger = next.clone();
        row.journal.push(entry);
        Ok(next)
    }

    fn journal(&self, member_id: MemberId) -> Result<Vec<JournalEntry>, StoreError> {
        match self.existing_row(member_id)? {
            Some(cell) => {
                let row = cell.lock().map_err(poisoned)?;
                Ok(row.journal.clone())
            }
            None => Ok(Vec::new()),
        }
    }
}

impl DistributionStore for InMemoryStore {
    fn create_distribution(&self, mut draft: DistributionRecord) -> Result<DistributionRecord, StoreError> {
        self.take_fault()?;
        draft.id = DistributionId(self.next_distribution_id.fetch_add(1, Ordering::SeqCst) + 1);

        let mut distributions = self.distributions.lock().map_err(poisoned)?;
        distributions.insert(draft.id, draft.clone());
        Ok(draft)
    }

    fn distribution(&self, id: DistributionId) -> Result<Option<DistributionRecord>, StoreError> {
        let distributions = self.distributions.lock().map_err(poisoned)?;
        Ok(distributions.get(&id).cloned())
    }

    fn distributions(&self) -> Result<Vec<DistributionRecord>, StoreError> {
        let distributions = self.distributions.lock().map_err(poisoned)?;
        Ok(distributions.values().cloned().collect())
    }

    fn set_distribution_status(&self, id: DistributionId, status: DistributionStatus) -> LedgerResult<()> {
        self.take_fault()?;
        let mut distributions = self.distributions.lock().map_err(poisoned)?;
        let record = distributions
            .get_mut(&id)
            .ok_or(LedgerError::DistributionNotFound { distribution_id: id })?;
        record.status = status;
        Ok(())
    }

    fn apply_allocation(
        &self,
        distribution_id: DistributionId,
        planned: &PlannedAllocation,
        currency: &str,
    ) -> LedgerResult<AllocationRecord> {
        self.take_fault()?;
        let cell = self.row(planned.member_id, currency)?;
        let mut row = cell.lock().map_err(poisoned)?;
        let mut distributions = self.distributions.lock().map_err(poisoned)?;

        let record = distributions
            .get_mut(&distribution_id)
            .ok_or(LedgerError::DistributionNotFound { distribution_id })?;
        if let Some(existing) = record.allocation_for(planned.member_id) {
            return Ok(existing.clone());
        }

        let mut next = row.ledger.clone();
        let status = settle_allocation(&mut next, planned)?;
        let now = Timestamp::now();

        if status == AllocationStatus::Settled {
            next.check_invariants()?;
            next.last_updated = now;
            let entry = JournalEntry::record(
                self.entry_id(),
                EntryKind::Distribution { distribution_id },
                planned.amount,
                &next,
            );
            row.ledger = next;
            row.journal.push(entry);
        }

        let allocation = AllocationRecord {
            distribution_id,
            member_id: planned.member_id,
            shares: planned.shares,
            amount: planned.amount,
            status,
            recorded_at: now,
        };
        record.allocations.push(allocation.clone());
        Ok(allocation)
    }
}

impl SettlementStore for InMemoryStore {
    fn max_period_number(&self) -> Result<Option<PeriodNumber>, StoreError> {
        let settlements = self.settlements.lock().map_err(poisoned)?;
        Ok(settlements.iter().map(|s| s.period_number).max())
    }

    fn insert_settlement(&self, record: SettlementRecord) -> Result<SettlementRecord, StoreError> {
        self.take_fault()?;
        let mut settlements = self.settlements.lock().map_err(poisoned)?;
        if settlements.iter().any(|s| s.period_number == record.period_number) {
            return Err(StoreError::Conflict(format!(
                "period {} already recorded",
                record.period_number
            )));
        }
        settlements.push(record.clone());
        Ok(record)
    }

    fn settlements(&self, limit: usize, offset: usize) -> Result<Vec<SettlementRecord>, StoreError> {
        let mut records = self.settlements.lock().map_err(poisoned)?.clone();
        records.sort_by(|a, b| b.date.cmp(&a.date).then(b.period_number.cmp(&a.period_number)));
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    fn latest_settlement(&self) -> Result<Option<SettlementRecord>, StoreError> {
        let settlements = self.settlements.lock().map_err(poisoned)?;
        Ok(settlements.iter().max_by_key(|s| s.period_number).cloned())
    }
}
