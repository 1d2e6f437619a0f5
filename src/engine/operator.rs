// 8.1 engine/operator.rs: the balance operator. the only path that mutates a ledger row.
// validates the member and amount up front, then hands one indivisible update to the store.

use std::sync::Arc;

use super::retry::with_retries;
use crate::config::LedgerConfig;
use crate::directory::MemberDirectory;
use crate::error::{LedgerError, LedgerResult};
use crate::journal::{JournalEntry, Mutation};
use crate::ledger::{ensure_positive, MemberLedger};
use crate::store::LedgerStore;
use crate::types::{MemberId, Money};

pub struct BalanceOperator<S> {
    store: Arc<S>,
    directory: Arc<dyn MemberDirectory>,
    config: LedgerConfig,
}

impl<S: LedgerStore> BalanceOperator<S> {
    pub fn new(store: Arc<S>, directory: Arc<dyn MemberDirectory>, config: LedgerConfig) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The member's ledger, created zeroed on first access.
    pub fn get_ledger(&self, member_id: MemberId) -> LedgerResult<MemberLedger> {
        self.ensure_member(member_id)?;
        with_retries(self.config.persistence_retries, "get_ledger", || {
            Ok(self.store.load_or_create(member_id, &self.config.currency)?)
        })
    }

    pub fn list_ledgers(&self) -> LedgerResult<Vec<MemberLedger>> {
        with_retries(self.config.persistence_retries, "list_ledgers", || Ok(self.store.list()?))
    }

    pub fn journal(&self, member_id: MemberId) -> LedgerResult<Vec<JournalEntry>> {
        self.ensure_member(member_id)?;
        with_retries(self.config.persistence_retries, "journal", || {
            Ok(self.store.journal(member_id)?)
        })
    }

    pub fn credit(&self, member_id: MemberId, amount: Money) -> LedgerResult<MemberLedger> {
        ensure_positive(amount)?;
        self.mutate(member_id, Mutation::credit(amount))
    }

    pub fn debit(&self, member_id: MemberId, amount: Money) -> LedgerResult<MemberLedger> {
        ensure_positive(amount)?;
        self.mutate(member_id, Mutation::debit(amount))
    }

    pub fn freeze(&self, member_id: MemberId, amount: Money) -> LedgerResult<MemberLedger> {
        ensure_positive(amount)?;
        self.mutate(member_id, Mutation::freeze(amount))
    }

    pub fn unfreeze(&self, member_id: MemberId, amount: Money) -> LedgerResult<MemberLedger> {
        ensure_positive(amount)?;
        self.mutate(member_id, Mutation::unfreeze(amount))
    }

    /// Signed adjustment. A negative delta larger than the available balance is
    /// rejected; the member is never driven below zero available funds. A zero
    /// delta writes nothing and returns the current row.
    pub fn apply_delta(&self, member_id: MemberId, delta: Money) -> LedgerResult<MemberLedger> {
        if delta.is_zero() {
            return self.get_ledger(member_id);
        }
        self.mutate(member_id, Mutation::adjustment(delta))
    }

    /// Loads a row carried over from elsewhere (a migration or a backup) in
    /// place of the stored one. The row must satisfy the balance invariants.
    /// Not journaled: the member's journal only covers movements made here.
    pub fn restore_ledger(&self, ledger: MemberLedger) -> LedgerResult<MemberLedger> {
        self.ensure_member(ledger.member_id)?;
        let restored = with_retries(self.config.persistence_retries, "restore_ledger", || {
            self.store.put(ledger.clone())
        })?;
        tracing::info!(
            member_id = %restored.member_id,
            balance = %restored.balance,
            available = %restored.available_balance,
            frozen = %restored.frozen_balance,
            "ledger restored"
        );
        Ok(restored)
    }

    /// Moves available funds between members. The two rows are updated in turn;
    /// if the credit fails the debit is reversed before the error is returned.
    /// If the reversal fails too, [`LedgerError::TransferCompensationFailed`]
    /// carries both errors and the sender is left debited.
    pub fn transfer(
        &self,
        from: MemberId,
        to: MemberId,
        amount: Money,
    ) -> LedgerResult<(MemberLedger, MemberLedger)> {
        ensure_positive(amount)?;
        self.ensure_member(to)?;

        let debited = self.debit(from, amount)?;
        match self.credit(to, amount) {
            Ok(credited) => Ok((debited, credited)),
            Err(e) => {
                tracing::warn!(from = %from, to = %to, amount = %amount, error = %e, "transfer credit failed, reversing debit");
                match self.credit(from, amount) {
                    Ok(_) => Err(e),
                    Err(reversal) => {
                        tracing::error!(
                            from = %from,
                            to = %to,
                            amount = %amount,
                            credit_error = %e,
                            reversal_error = %reversal,
                            "transfer debit could not be reversed"
                        );
                        Err(LedgerError::TransferCompensationFailed {
                            from,
                            to,
                            amount,
                            credit_error: Box::new(e),
                            reversal_error: Box::new(reversal),
                        })
                    }
                }
            }
        }
    }

    fn ensure_member(&self, member_id: MemberId) -> LedgerResult<()> {
        if self.directory.contains(member_id) {
            Ok(())
        } else {
            Err(LedgerError::MemberNotFound { member_id })
        }
    }

    fn mutate(&self, member_id: MemberId, mutation: Mutation) -> LedgerResult<MemberLedger> {
        self.ensure_member(member_id)?;

        let result = with_retries(self.config.persistence_retries, "ledger_update", || {
            self.store.update(member_id, &self.config.currency, mutation)
        });

        match &result {
            Ok(ledger) => tracing::info!(
                member_id = %member_id,
                kind = ?mutation.kind,
                amount = %mutation.amount,
                balance = %ledger.balance,
                available = %ledger.available_balance,
                frozen = %ledger.frozen_balance,
                "ledger updated"
            ),
            Err(e) => tracing::debug!(
                member_id = %member_id,
                kind = ?mutation.kind,
                amount = %mutation.amount,
                error = %e,
                "ledger update rejected"
            ),
        }
        result
    }
}
