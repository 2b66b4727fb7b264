//! Error types for the ledger.
//!
//! Recoverable failures ([`TransactionError`], [`VerifyError`], and the
//! umbrella [`LedgerError`]) are returned to the caller as values.
//! [`ContractViolation`] is kept apart: it has no conversion into
//! [`LedgerError`], so `?` cannot fold it into an ordinary failure.
use thiserror::Error;

use crate::types::SlotId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("unknown input: {0}")] UnknownInput(String),
    #[error("double spend of {0}")] DoubleSpend(String),
    #[error("value not conserved: inputs {inputs}, outputs {outputs}")] ConservationViolation { inputs: u64, outputs: u64 },
    #[error("empty inputs or outputs")] EmptyInputsOrOutputs,
    #[error("zero-value output at index {0}")] ZeroValueOutput(usize),
    #[error("duplicate input: {0}")] DuplicateInput(String),
    #[error("output already exists: {0}")] DuplicateOutput(String),
    #[error("value overflow")] ValueOverflow,
    #[error("serialization: {0}")] Serialization(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("no snapshot at depth {requested}: history holds {available}")] DepthUnavailable { requested: usize, available: usize },
    #[error("block at slot {slot} rejected: {source}")] BlockRejected { slot: SlotId, source: TransactionError },
    #[error("candidate chain is empty")] EmptyChain,
}

/// A caller broke the verify-before-commit protocol.
///
/// Raised only by mutating operations, and always before anything was
/// mutated. Not recoverable: the caller's view of the ledger is wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("contract violation: chain committed without verifying: {source}")] UnverifiedChain { source: VerifyError },
    #[error("contract violation: rollback of {requested} blocks past history of {available}")] RollbackPastHistory { requested: usize, available: usize },
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error(transparent)] Transaction(#[from] TransactionError),
    #[error(transparent)] Verify(#[from] VerifyError),
    #[error("history is empty")] EmptyHistory,
    #[error("config: {0}")] Config(String),
    #[error("persistence: {0}")] Persistence(String),
    #[error(transparent)] Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_rejected_names_slot_and_cause() {
        let err = VerifyError::BlockRejected {
            slot: SlotId::new(2, 17),
            source: TransactionError::DoubleSpend("ab:0".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("2.17"), "{msg}");
        assert!(msg.contains("double spend of ab:0"), "{msg}");
    }

    #[test]
    fn ledger_error_wraps_verify_transparently() {
        let err: LedgerError = VerifyError::DepthUnavailable { requested: 5, available: 2 }.into();
        assert_eq!(err.to_string(), "no snapshot at depth 5: history holds 2");
    }

    #[test]
    fn contract_violation_is_labelled() {
        let err = ContractViolation::RollbackPastHistory { requested: 3, available: 1 };
        assert!(err.to_string().starts_with("contract violation"));
    }
}
