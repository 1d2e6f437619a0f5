//! Stress tests
//!
//! These tests hammer the ledger from many threads at once to verify that
//! concurrent writers never lose an update or break the balance invariants.

use fund_ledger::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::thread;

fn fund_with(holdings: &[Decimal], regulars: u64) -> FundLedger<InMemoryStore> {
    let directory = InMemoryDirectory::with_members(holdings.iter().enumerate().map(|(i, s)| {
        Member::shareholder(MemberId(i as u64 + 1), format!("holder-{}", i + 1), Shares::new_unchecked(*s))
    }));
    for n in 0..regulars {
        directory.upsert(Member::regular(MemberId(1000 + n), format!("regular-{}", n)));
    }
    FundLedger::in_memory(Arc::new(directory), LedgerConfig::default())
}

fn day() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

fn assert_consistent(ledger: &MemberLedger) {
    assert_eq!(ledger.balance, ledger.available_balance.add(ledger.frozen_balance));
    assert!(!ledger.available_balance.is_negative());
    assert!(!ledger.frozen_balance.is_negative());
}

/// Many writers on one row.
mod contention_tests {
    use super::*;

    #[test]
    fn fifty_concurrent_credits_all_land() {
        let fund = fund_with(&[], 1);
        let member = MemberId(1000);

        thread::scope(|s| {
            for _ in 0..50 {
                s.spawn(|| fund.credit(member, Money::new(dec!(100))).unwrap());
            }
        });

        let ledger = fund.get_ledger(member).unwrap();
        assert_eq!(ledger.balance.value(), dec!(5000));
        assert_eq!(ledger.available_balance.value(), dec!(5000));
        assert_eq!(fund.journal(member).unwrap().len(), 50);
    }

    #[test]
    fn concurrent_debits_never_overdraw() {
        let fund = fund_with(&[], 1);
        let member = MemberId(1000);
        fund.credit(member, Money::new(dec!(1000))).unwrap();

        // 40 withdrawals of 30 against 1000: exactly 33 fit
        let succeeded: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..40)
                .map(|_| s.spawn(|| fund.debit(member, Money::new(dec!(30))).is_ok()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap() as usize).sum()
        });

        let ledger = fund.get_ledger(member).unwrap();
        assert_eq!(succeeded, 33);
        assert_eq!(ledger.balance.value(), dec!(10));
        assert_consistent(&ledger);
    }

    #[test]
    fn mixed_freezes_and_debits_keep_invariants() {
        let fund = fund_with(&[], 1);
        let member = MemberId(1000);
        fund.credit(member, Money::new(dec!(500))).unwrap();

        thread::scope(|s| {
            for i in 0..60 {
                let fund = &fund;
                s.spawn(move || {
                    let amount = Money::new(Decimal::from(i % 7 + 1));
                    let _ = match i % 4 {
                        0 => fund.freeze(member, amount),
                        1 => fund.unfreeze(member, amount),
                        2 => fund.debit(member, amount),
                        _ => fund.credit(member, amount),
                    };
                });
            }
        });

        let ledger = fund.get_ledger(member).unwrap();
        assert_consistent(&ledger);

        // every accepted call is in the journal, and it reconciles
        let moved: Money = fund
            .journal(member)
            .unwrap()
            .iter()
            .filter(|e| !matches!(e.kind, EntryKind::Freeze | EntryKind::Unfreeze))
            .map(|e| e.amount)
            .sum();
        assert_eq!(moved, ledger.balance);
    }
}

/// Many writers across many rows.
mod spread_tests {
    use super::*;

    #[test]
    fn transfers_conserve_total() {
        let fund = fund_with(&[], 10);
        for n in 0..10 {
            fund.credit(MemberId(1000 + n), Money::new(dec!(100))).unwrap();
        }

        thread::scope(|s| {
            for i in 0..200u64 {
                let fund = &fund;
                s.spawn(move || {
                    let from = MemberId(1000 + i % 10);
                    let to = MemberId(1000 + (i * 3 + 1) % 10);
                    if from != to {
                        let _ = fund.transfer(from, to, Money::new(dec!(7.5)));
                    }
                });
            }
        });

        let ledgers = fund.list_ledgers().unwrap();
        let total: Money = ledgers.iter().map(|l| l.balance).sum();
        assert_eq!(total.value(), dec!(1000));
        ledgers.iter().for_each(assert_consistent);
    }
}

/// Distribution runs overlapping ordinary traffic.
mod distribution_tests {
    use super::*;

    #[test]
    fn dividend_overlapping_deposits() {
        let holdings = [dec!(2), dec!(1), dec!(0.5), dec!(1.5)];
        let fund = fund_with(&holdings, 0);

        thread::scope(|s| {
            s.spawn(|| {
                fund.run_distribution(Money::new(dec!(1000)), Shares::new_unchecked(dec!(5)), None, day())
                    .unwrap()
            });
            for member in 1..=4u64 {
                let fund = &fund;
                s.spawn(move || {
                    for _ in 0..25 {
                        fund.credit(MemberId(member), Money::new(dec!(10))).unwrap();
                    }
                });
            }
        });

        // 400 in deposits plus the 1000 dividend, nothing lost to interleaving
        let ledgers = fund.list_ledgers().unwrap();
        let total: Money = ledgers.iter().map(|l| l.balance).sum();
        assert_eq!(total.value(), dec!(1400));
        assert_eq!(fund.get_ledger(MemberId(1)).unwrap().balance.value(), dec!(650));
        assert_eq!(fund.get_ledger(MemberId(3)).unwrap().balance.value(), dec!(350));
    }

    #[test]
    fn racing_resumes_apply_each_member_once() {
        let fund = fund_with(&[dec!(1), dec!(2), dec!(3)], 0);
        let plan = fund
            .plan_distribution(Money::new(dec!(600)), Shares::new_unchecked(dec!(6)), None)
            .unwrap();
        let record = fund
            .store()
            .create_distribution(DistributionRecord::draft(day(), &plan))
            .unwrap();

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let _ = fund.resume_distribution(record.id);
                });
            }
        });

        let done = fund.distribution(record.id).unwrap();
        assert_eq!(done.allocations.len(), 3);
        assert_eq!(fund.get_ledger(MemberId(1)).unwrap().balance.value(), dec!(100));
        assert_eq!(fund.get_ledger(MemberId(2)).unwrap().balance.value(), dec!(200));
        assert_eq!(fund.get_ledger(MemberId(3)).unwrap().balance.value(), dec!(300));
        assert_eq!(fund.journal(MemberId(3)).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_settlements_get_distinct_periods() {
        let fund = fund_with(&[dec!(1)], 0);

        thread::scope(|s| {
            for i in 0..4 {
                let fund = &fund;
                s.spawn(move || {
                    fund.record_settlement(day(), Money::new(Decimal::from(100 + i)), Money::zero(), format!("batch {}", i))
                        .unwrap()
                });
            }
        });

        let mut periods: Vec<PeriodNumber> = fund
            .settlement_history(10, 0)
            .unwrap()
            .iter()
            .map(|s| s.period_number)
            .collect();
        periods.sort_unstable();
        assert_eq!(periods, vec![1, 2, 3, 4]);
    }
}
