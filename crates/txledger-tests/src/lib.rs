//! Integration test suite for txledger.
//!
//! Exercises the storage aggregate end to end through its public traits:
//! block application, rollback, chain switches, pending reconciliation,
//! persistence and shared access. Property tests live in `tests/properties.rs`.

pub mod helpers;
