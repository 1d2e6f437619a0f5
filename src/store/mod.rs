// 6.0: persistence layer. traits describe the transactional row access the ledger core
// needs; the in-memory store backs tests, the simulation and single-process deployments.

mod memory;
mod traits;

pub use memory::InMemoryStore;
pub use traits::{DistributionStore, LedgerStore, SettlementStore};
