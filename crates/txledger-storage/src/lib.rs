//! # txledger-storage
//! History stack, chain verification, block application, rollback and
//! pending reconciliation over an in-memory UTXO ledger.

pub mod config;
pub mod history;
pub mod persist;
pub mod shared;
pub mod storage;
pub mod verify;

pub use config::LedgerConfig;
pub use history::History;
pub use persist::PersistedHistory;
pub use shared::SharedLedger;
pub use storage::TxStorage;
