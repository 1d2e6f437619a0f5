//! Fund Ledger Simulation.
//!
//! Walks the ledger through a full year: deposits and freezes, a dividend,
//! a loss that one member cannot cover, settlements, and concurrent deposits.

use fund_ledger::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn main() {
    telemetry::init(LogFormat::Compact);

    println!("Fund Ledger Simulation");
    println!("Member balances, distributions and settlements\n");

    scenario_1_deposits_and_freezes();
    scenario_2_dividend();
    scenario_3_loss_with_unsettled_member();
    scenario_4_settlement_then_distribution();
    scenario_5_concurrent_deposits();

    println!("\nAll simulations completed successfully.");
}

fn club() -> Arc<InMemoryDirectory> {
    Arc::new(InMemoryDirectory::with_members([
        Member::shareholder(MemberId(1), "alice", Shares::new_unchecked(dec!(2))),
        Member::shareholder(MemberId(2), "bob", Shares::new_unchecked(dec!(1))),
        Member::shareholder(MemberId(3), "carol", Shares::new_unchecked(dec!(0.5))),
        Member::regular(MemberId(4), "dave"),
    ]))
}

fn date(month: u32, day: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn print_ledger(fund: &FundLedger<InMemoryStore>, name: &str, member_id: MemberId) {
    let ledger = fund.get_ledger(member_id).unwrap();
    println!(
        "    {}: balance ${}, available ${}, frozen ${}",
        name, ledger.balance, ledger.available_balance, ledger.frozen_balance
    );
}

/// Deposits, a freeze, and an overdraw that gets rejected.
fn scenario_1_deposits_and_freezes() {
    println!("Scenario 1: Deposits and Freezes\n");

    let fund = FundLedger::in_memory(club(), LedgerConfig::default());

    fund.credit(MemberId(4), Money::new(dec!(500))).unwrap();
    fund.freeze(MemberId(4), Money::new(dec!(200))).unwrap();
    println!("  Dave deposits $500 and freezes $200 against a pending order");
    print_ledger(&fund, "dave", MemberId(4));

    match fund.debit(MemberId(4), Money::new(dec!(400))) {
        Ok(_) => println!("  Unexpected: overdraw accepted"),
        Err(e) => println!("  Withdrawal of $400 rejected: {}", e),
    }

    fund.unfreeze(MemberId(4), Money::new(dec!(200))).unwrap();
    fund.debit(MemberId(4), Money::new(dec!(400))).unwrap();
    println!("  After unfreezing, the $400 withdrawal goes through");
    print_ledger(&fund, "dave", MemberId(4));

    let entries = fund.journal(MemberId(4)).unwrap();
    println!("  Journal holds {} entries\n", entries.len());
}

/// $1000 over holdings of 2, 1 and 0.5 shares.
fn scenario_2_dividend() {
    println!("Scenario 2: Dividend\n");

    let fund = FundLedger::in_memory(club(), LedgerConfig::default());
    let record = fund
        .run_distribution(Money::new(dec!(1000)), Shares::new_unchecked(dec!(3.5)), None, date(6, 30))
        .unwrap();

    println!("  Distributing $1000 over 3.5 shares, ${} per share", record.amount_per_share.round_dp(4));
    for allocation in &record.allocations {
        println!("    {}: {} shares -> ${}", allocation.member_id, allocation.shares, allocation.amount);
    }
    let summary = record.summary();
    println!("  Settled total: ${}\n", summary.settled_total);
}

/// A $8500 loss over 10 shares where one member runs short.
fn scenario_3_loss_with_unsettled_member() {
    println!("Scenario 3: Loss With Unsettled Member\n");

    let directory = Arc::new(InMemoryDirectory::with_members([
        Member::shareholder(MemberId(1), "erin", Shares::new_unchecked(dec!(4))),
        Member::shareholder(MemberId(2), "frank", Shares::new_unchecked(dec!(6))),
    ]));
    let fund = FundLedger::in_memory(directory, LedgerConfig::default());
    fund.credit(MemberId(1), Money::new(dec!(5000))).unwrap();
    fund.credit(MemberId(2), Money::new(dec!(1000))).unwrap();

    let record = fund
        .run_distribution(Money::new(dec!(-8500)), Shares::new_unchecked(dec!(10)), None, date(9, 30))
        .unwrap();

    println!("  Loss of $8500, ${} per share", record.amount_per_share);
    print_ledger(&fund, "erin", MemberId(1));
    print_ledger(&fund, "frank", MemberId(2));

    for owed in fund.unsettled_allocations(record.id).unwrap() {
        println!("  {} still owes ${}", owed.member_id, owed.amount.abs());
    }
    println!();
}

/// Two settlements, then an automatic distribution of the latest one.
fn scenario_4_settlement_then_distribution() {
    println!("Scenario 4: Settlement Then Distribution\n");

    let fund = FundLedger::in_memory(club(), LedgerConfig::default());

    let q1 = fund
        .record_settlement(date(3, 31), Money::new(dec!(12000)), Money::new(dec!(9000)), "q1")
        .unwrap();
    let q2 = fund
        .record_settlement(date(6, 30), Money::new(dec!(8000)), Money::new(dec!(7300)), "q2")
        .unwrap();
    println!("  Period {}: net ${}", q1.period_number, q1.net_profit);
    println!("  Period {}: net ${}", q2.period_number, q2.net_profit);

    let record = fund.run_from_latest_settlement(None, date(7, 1)).unwrap().unwrap();
    println!("  Distributed ${} from period {}", record.total_profit, q2.period_number);
    print_ledger(&fund, "alice", MemberId(1));
    print_ledger(&fund, "bob", MemberId(2));
    print_ledger(&fund, "carol", MemberId(3));
    println!("  Next period number: {}\n", fund.next_period_number().unwrap());
}

/// 50 threads depositing into one ledger at once.
fn scenario_5_concurrent_deposits() {
    println!("Scenario 5: Concurrent Deposits\n");

    let fund = FundLedger::in_memory(club(), LedgerConfig::default());
    std::thread::scope(|s| {
        for _ in 0..50 {
            s.spawn(|| fund.credit(MemberId(4), Money::new(dec!(100))).unwrap());
        }
    });

    println!("  50 concurrent deposits of $100");
    print_ledger(&fund, "dave", MemberId(4));
    println!("  Journal entries: {}", fund.journal(MemberId(4)).unwrap().len());
}
