//! Member ledger rows and their state transitions.
//!
//! Every transition checks its precondition before touching any field, so a
//! rejected call leaves the row exactly as it was. Callers never mutate a
//! ledger directly; the store runs these transitions under the row lock.

use crate::error::{LedgerError, LedgerResult};
use crate::types::{MemberId, Money, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLedger {
    pub member_id: MemberId,
    pub balance: Money,
    pub available_balance: Money,
    pub frozen_balance: Money,
    pub currency: String,
    pub last_updated: Timestamp,
}

impl MemberLedger {
    pub fn new(member_id: MemberId, currency: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            member_id,
            balance: Money::zero(),
            available_balance: Money::zero(),
            frozen_balance: Money::zero(),
            currency: currency.into(),
            last_updated: timestamp,
        }
    }

    // balance == available + frozen, and neither part below zero
    pub fn check_invariants(&self) -> LedgerResult<()> {
        if self.available_balance.checked_add(self.frozen_balance) != Some(self.balance) {
            return Err(LedgerError::InvariantViolation {
                member_id: self.member_id,
                reason: format!(
                    "balance {} != available {} + frozen {}",
                    self.balance, self.available_balance, self.frozen_balance
                ),
            });
        }
        if self.available_balance.is_negative() || self.frozen_balance.is_negative() {
            return Err(LedgerError::InvariantViolation {
                member_id: self.member_id,
                reason: format!(
                    "negative component: available {}, frozen {}",
                    self.available_balance, self.frozen_balance
                ),
            });
        }
        Ok(())
    }

    pub fn credit(&mut self, amount: Money) -> LedgerResult<()> {
        ensure_positive(amount)?;
        let balance = plus(self.balance, amount, "credit")?;
        let available = plus(self.available_balance, amount, "credit")?;
        self.balance = balance;
        self.available_balance = available;
        Ok(())
    }

    pub fn debit(&mut self, amount: Money) -> LedgerResult<()> {
        ensure_positive(amount)?;
        self.ensure_available(amount)?;
        let balance = minus(self.balance, amount, "debit")?;
        let available = minus(self.available_balance, amount, "debit")?;
        self.balance = balance;
        self.available_balance = available;
        Ok(())
    }

    // reclassifies value, balance stays put
    pub fn freeze(&mut self, amount: Money) -> LedgerResult<()> {
        ensure_positive(amount)?;
        self.ensure_available(amount)?;
        let available = minus(self.available_balance, amount, "freeze")?;
        let frozen = plus(self.frozen_balance, amount, "freeze")?;
        self.available_balance = available;
        self.frozen_balance = frozen;
        Ok(())
    }

    pub fn unfreeze(&mut self, amount: Money) -> LedgerResult<()> {
        ensure_positive(amount)?;
        if self.frozen_balance < amount {
            return Err(LedgerError::InsufficientFrozenBalance {
                member_id: self.member_id,
                requested: amount,
                frozen: self.frozen_balance,
            });
        }
        let frozen = minus(self.frozen_balance, amount, "unfreeze")?;
        let available = plus(self.available_balance, amount, "unfreeze")?;
        self.frozen_balance = frozen;
        self.available_balance = available;
        Ok(())
    }

    /// Signed adjustment used by distributions. A negative delta can only be
    /// absorbed from available funds; frozen funds are never touched.
    pub fn apply_delta(&mut self, delta: Money) -> LedgerResult<()> {
        if delta.is_negative() {
            self.ensure_available(delta.abs())?;
        }
        let balance = plus(self.balance, delta, "apply_delta")?;
        let available = plus(self.available_balance, delta, "apply_delta")?;
        self.balance = balance;
        self.available_balance = available;
        Ok(())
    }

    fn ensure_available(&self, amount: Money) -> LedgerResult<()> {
        if self.available_balance < amount {
            return Err(LedgerError::InsufficientAvailableBalance {
                member_id: self.member_id,
                requested: amount,
                available: self.available_balance,
            });
        }
        Ok(())
    }
}

fn plus(a: Money, b: Money, operation: &'static str) -> LedgerResult<Money> {
    a.checked_add(b).ok_or(LedgerError::AmountOverflow { operation })
}

fn minus(a: Money, b: Money, operation: &'static str) -> LedgerResult<Money> {
    a.checked_sub(b).ok_or(LedgerError::AmountOverflow { operation })
}

pub fn ensure_positive(amount: Money) -> LedgerResult<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount { amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn funded(amount: rust_decimal::Decimal) -> MemberLedger {
        let mut ledger = MemberLedger::new(MemberId(1), "USD", Timestamp::from_millis(0));
        ledger.credit(Money::new(amount)).unwrap();
        ledger
    }

    #[test]
    fn credit_and_debit() {
        let mut ledger = funded(dec!(1000));
        assert_eq!(ledger.balance.value(), dec!(1000));
        assert_eq!(ledger.available_balance.value(), dec!(1000));

        ledger.debit(Money::new(dec!(250))).unwrap();
        assert_eq!(ledger.balance.value(), dec!(750));
        assert_eq!(ledger.available_balance.value(), dec!(750));
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn debit_more_than_available_changes_nothing() {
        let mut ledger = funded(dec!(100));
        ledger.freeze(Money::new(dec!(60))).unwrap();
        let before = ledger.clone();

        let result = ledger.debit(Money::new(dec!(50)));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientAvailableBalance { available, .. }) if available.value() == dec!(40)
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn freeze_keeps_balance() {
        let mut ledger = funded(dec!(500));
        ledger.freeze(Money::new(dec!(200))).unwrap();

        assert_eq!(ledger.balance.value(), dec!(500));
        assert_eq!(ledger.available_balance.value(), dec!(300));
        assert_eq!(ledger.frozen_balance.value(), dec!(200));
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn unfreeze_more_than_frozen() {
        let mut ledger = funded(dec!(500));
        ledger.freeze(Money::new(dec!(100))).unwrap();

        let result = ledger.unfreeze(Money::new(dec!(150)));
        assert!(matches!(result, Err(LedgerError::InsufficientFrozenBalance { .. })));
        assert_eq!(ledger.frozen_balance.value(), dec!(100));
    }

    #[test]
    fn freeze_unfreeze_round_trip() {
        let mut ledger = funded(dec!(123.45));
        let before = ledger.clone();
        ledger.freeze(Money::new(dec!(23.45))).unwrap();
        ledger.unfreeze(Money::new(dec!(23.45))).unwrap();
        assert_eq!(ledger, before);
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let mut ledger = funded(dec!(10));
        assert!(matches!(ledger.credit(Money::zero()), Err(LedgerError::InvalidAmount { .. })));
        assert!(matches!(
            ledger.debit(Money::new(dec!(-1))),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn negative_delta_cannot_touch_frozen_funds() {
        let mut ledger = funded(dec!(1000));
        ledger.freeze(Money::new(dec!(900))).unwrap();

        let result = ledger.apply_delta(Money::new(dec!(-200)));
        assert!(matches!(result, Err(LedgerError::InsufficientAvailableBalance { .. })));
        assert_eq!(ledger.balance.value(), dec!(1000));

        ledger.apply_delta(Money::new(dec!(-100))).unwrap();
        assert_eq!(ledger.balance.value(), dec!(900));
        assert_eq!(ledger.available_balance.value(), dec!(0));
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn overflowing_credit_rejected_and_row_unchanged() {
        let mut ledger = funded(rust_decimal::Decimal::MAX);
        let before = ledger.clone();

        let result = ledger.credit(Money::new(dec!(1)));
        assert!(matches!(result, Err(LedgerError::AmountOverflow { operation: "credit" })));
        assert_eq!(ledger, before);

        let result = ledger.apply_delta(Money::new(dec!(1)));
        assert!(matches!(result, Err(LedgerError::AmountOverflow { .. })));
        assert_eq!(ledger, before);

        // still usable afterwards
        ledger.debit(Money::new(dec!(1))).unwrap();
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn invariant_check_survives_huge_parts() {
        let mut ledger = funded(dec!(1));
        ledger.available_balance = Money::new(rust_decimal::Decimal::MAX);
        ledger.frozen_balance = Money::new(rust_decimal::Decimal::MAX);
        assert!(matches!(
            ledger.check_invariants(),
            Err(LedgerError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn invariant_check_catches_drift() {
        let mut ledger = funded(dec!(10));
        ledger.balance = Money::new(dec!(11));
        assert!(matches!(
            ledger.check_invariants(),
            Err(LedgerError::InvariantViolation { .. })
        ));
    }
}
