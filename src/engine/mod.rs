// 8.0: ledger engine. the balance operator, the distribution engine and the settlement
// recorder over one shared store. every balance change goes through the store's
// atomic row update; nothing here caches ledger state.

mod core;
mod distributor;
mod operator;
mod recorder;
mod retry;

pub use core::FundLedger;
pub use distributor::{CancelFlag, DistributionEngine};
pub use operator::BalanceOperator;
pub use recorder::SettlementRecorder;
