//! Property-based tests for the balance and allocation math.
//!
//! These tests verify the ledger invariants hold under random inputs.

use fund_ledger::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Op {
    Credit(Decimal),
    Debit(Decimal),
    Freeze(Decimal),
    Unfreeze(Decimal),
    Delta(Decimal),
}

// Strategies for generating test data
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)) // $0.01 to $10,000
}

fn delta_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..=1_000_000i64).prop_map(|x| Decimal::new(x, 2))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        amount_strategy().prop_map(Op::Credit),
        amount_strategy().prop_map(Op::Debit),
        amount_strategy().prop_map(Op::Freeze),
        amount_strategy().prop_map(Op::Unfreeze),
        delta_strategy().prop_map(Op::Delta),
    ]
}

fn holdings_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec((1i64..10_000i64).prop_map(|x| Decimal::new(x, 1)), 1..8) // 0.1 to 999.9 shares
}

fn solo_fund() -> FundLedger<InMemoryStore> {
    let directory = InMemoryDirectory::with_members([Member::regular(MemberId(1), "solo")]);
    FundLedger::in_memory(Arc::new(directory), LedgerConfig::default())
}

fn apply(fund: &FundLedger<InMemoryStore>, op: Op) -> LedgerResult<MemberLedger> {
    let member = MemberId(1);
    match op {
        Op::Credit(a) => fund.credit(member, Money::new(a)),
        Op::Debit(a) => fund.debit(member, Money::new(a)),
        Op::Freeze(a) => fund.freeze(member, Money::new(a)),
        Op::Unfreeze(a) => fund.unfreeze(member, Money::new(a)),
        Op::Delta(d) => fund.apply_delta(member, Money::new(d)),
    }
}

fn holders(holdings: &[Decimal]) -> Vec<Shareholder> {
    holdings
        .iter()
        .enumerate()
        .map(|(i, s)| Shareholder {
            member_id: MemberId(i as u64 + 1),
            shares: Shares::new_unchecked(*s),
        })
        .collect()
}

proptest! {
    /// balance = available + frozen, neither negative, after any sequence of calls
    #[test]
    fn invariants_hold_over_any_sequence(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let fund = solo_fund();

        for op in ops {
            let before = fund.get_ledger(MemberId(1)).unwrap();
            match apply(&fund, op) {
                Ok(after) => {
                    prop_assert_eq!(after.balance, after.available_balance.add(after.frozen_balance));
                    prop_assert!(!after.available_balance.is_negative());
                    prop_assert!(!after.frozen_balance.is_negative());
                }
                Err(_) => {
                    // a rejected call changes nothing
                    prop_assert_eq!(fund.get_ledger(MemberId(1)).unwrap(), before);
                }
            }
        }
    }

    /// The balance is exactly the sum of the journaled money movements
    #[test]
    fn journal_reconciles_with_balance(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let fund = solo_fund();
        for op in ops {
            let _ = apply(&fund, op);
        }

        let ledger = fund.get_ledger(MemberId(1)).unwrap();
        let moved: Money = fund
            .journal(MemberId(1))
            .unwrap()
            .iter()
            .filter(|e| !matches!(e.kind, EntryKind::Freeze | EntryKind::Unfreeze))
            .map(|e| e.amount)
            .sum();
        prop_assert_eq!(moved, ledger.balance);
    }

    /// Freezing then unfreezing the same amount is a no-op on every field
    #[test]
    fn freeze_unfreeze_round_trip(
        deposit in amount_strategy(),
        fraction in 1u32..=100u32,
    ) {
        let fund = solo_fund();
        let start = fund.credit(MemberId(1), Money::new(deposit)).unwrap();
        let amount = Money::new(deposit * Decimal::from(fraction) / dec!(100)).round_to(dec!(0.01)).unwrap();
        prop_assume!(amount.is_positive());

        fund.freeze(MemberId(1), amount).unwrap();
        let end = fund.unfreeze(MemberId(1), amount).unwrap();

        prop_assert_eq!(end.balance, start.balance);
        prop_assert_eq!(end.available_balance, start.available_balance);
        prop_assert!(end.frozen_balance.is_zero());
    }

    /// Allocations sum to the profit to the cent, whatever the holdings
    #[test]
    fn allocations_sum_to_profit(
        holdings in holdings_strategy(),
        cents in -10_000_000i64..=10_000_000i64,
    ) {
        let profit = Money::new(Decimal::new(cents, 2));
        let total: Shares = holdings.iter().map(|s| Shares::new_unchecked(*s)).sum();

        let plan = plan_allocations(profit, total, Shares::new_unchecked(Decimal::ONE), &holders(&holdings), dec!(0.01)).unwrap();
        prop_assert_eq!(plan.total(), profit);
        prop_assert_eq!(plan.is_loss, profit.is_negative());
        // a dividend never debits anyone and a loss never credits anyone
        for allocation in &plan.allocations {
            prop_assert_eq!(allocation.amount.is_negative(), profit.is_negative());
        }
    }

    /// Every allocation stays within rounding distance of its exact share
    #[test]
    fn allocations_track_exact_share(
        holdings in holdings_strategy(),
        cents in -10_000_000i64..=10_000_000i64,
    ) {
        let profit = Money::new(Decimal::new(cents, 2));
        let total: Shares = holdings.iter().map(|s| Shares::new_unchecked(*s)).sum();
        let plan = plan_allocations(profit, total, Shares::new_unchecked(Decimal::ONE), &holders(&holdings), dec!(0.01)).unwrap();

        // the correction is at most half a cent per participant
        let tolerance = dec!(0.005) * Decimal::from(holdings.len() as u64 + 1);
        for allocation in &plan.allocations {
            let exact = allocation.shares.value() * plan.amount_per_share;
            prop_assert!((allocation.amount.value() - exact).abs() <= tolerance);
        }
    }

    /// Participation is all or nothing: a holder absent from a plan has a zero amount
    #[test]
    fn zero_holdings_never_allocated(
        holdings in holdings_strategy(),
        cents in 1i64..=10_000_000i64,
    ) {
        let mut with_zero = holders(&holdings);
        with_zero.push(Shareholder { member_id: MemberId(999), shares: Shares::zero() });
        let total: Shares = with_zero.iter().map(|h| h.shares).sum();

        let plan = plan_allocations(Money::new(Decimal::new(cents, 2)), total, Shares::new_unchecked(Decimal::ONE), &with_zero, dec!(0.01)).unwrap();
        prop_assert!(plan.allocations.iter().all(|a| a.member_id != MemberId(999)));
    }
}

/// Deterministic edge cases the strategies rarely hit.
mod edge_tests {
    use super::*;

    #[test]
    fn thirds_sum_exactly() {
        let plan = plan_allocations(
            Money::new(dec!(100)),
            Shares::new_unchecked(dec!(3)),
            Shares::new_unchecked(Decimal::ONE),
            &holders(&[dec!(1), dec!(1), dec!(1)]),
            dec!(0.01),
        )
        .unwrap();
        assert_eq!(plan.total().value(), dec!(100));
        assert_eq!(plan.allocations[0].amount.value(), dec!(33.34));
    }

    #[test]
    fn one_cent_over_many_holders() {
        let plan = plan_allocations(
            Money::new(dec!(0.01)),
            Shares::new_unchecked(dec!(5)),
            Shares::new_unchecked(Decimal::ONE),
            &holders(&[dec!(1); 5]),
            dec!(0.01),
        )
        .unwrap();
        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].member_id, MemberId(1));
        assert_eq!(plan.total().value(), dec!(0.01));
    }

    #[test]
    fn whole_unit_currency() {
        let plan = plan_allocations(
            Money::new(dec!(1000)),
            Shares::new_unchecked(dec!(3.5)),
            Shares::new_unchecked(dec!(0.5)),
            &holders(&[dec!(2), dec!(1), dec!(0.5)]),
            Decimal::ONE,
        )
        .unwrap();
        let amounts: Vec<Decimal> = plan.allocations.iter().map(|a| a.amount.value()).collect();
        assert_eq!(amounts, vec![dec!(571), dec!(286), dec!(143)]);
        assert_eq!(plan.total().value(), dec!(1000));
    }
}
