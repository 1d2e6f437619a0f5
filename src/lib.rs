// fund-ledger: member balances, shareholder distributions and period settlements.
// balance-first architecture: every change is an atomic row update that keeps
// balance = available + frozen with neither part negative.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MemberId, DistributionId, Money, Shares, Timestamp
//   2.x  ledger.rs: member ledger row and its transitions
//   3.x  journal.rs: mutations and the per-member journal
//   4.x  distribution.rs: allocation planning, rounding, settle/unsettled
//   5.x  settlement.rs: period summaries and numbering
//   6.x  directory.rs: members, categories, shareholdings
//   7.x  config.rs: currency, rounding, retry bounds, env presets
//   8.x  engine/: operator, distributor, recorder, fund ledger facade
//   9.x  store/: store traits and the in-memory store
//   10.x error.rs: ledger and store errors
//   11.x telemetry.rs: log subscriber setup

// ledger modules
pub mod distribution;
pub mod engine;
pub mod journal;
pub mod ledger;
pub mod settlement;
pub mod types;

// infrastructure
pub mod config;
pub mod directory;
pub mod error;
pub mod store;
pub mod telemetry;

// re exports for convenience
pub use config::{ConfigError, Environment, LedgerConfig};
pub use directory::{InMemoryDirectory, Member, MemberCategory, MemberDirectory, Shareholder};
pub use distribution::*;
pub use engine::*;
pub use error::{LedgerError, LedgerResult, StoreError};
pub use journal::{EntryKind, JournalEntry, Mutation};
pub use ledger::MemberLedger;
pub use settlement::{PeriodNumber, SettlementDraft, SettlementRecord};
pub use store::{DistributionStore, InMemoryStore, LedgerStore, SettlementStore};
pub use telemetry::LogFormat;
pub use types::*;
