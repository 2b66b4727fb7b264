//! Transaction validation against a UTXO snapshot.
//!
//! Two levels of validation:
//!
//! - **Structural** ([`validate_transaction_structure`]): context-free checks on
//!   transaction format. No snapshot required.
//! - **Contextual** ([`validate_transaction`]): input existence, single
//!   assignment of outputs, and value conservation against a snapshot.
//!
//! [`UtxoVerifier`] combines both into a [`TxVerifier`] for whole blocks.
//! Signatures are out of scope here; a node that needs them wraps this
//! verifier or supplies its own.

use std::collections::HashSet;

use crate::error::TransactionError;
use crate::traits::{TxVerifier, Verified};
use crate::types::{OutPoint, Transaction, TxOutput, Utxo, WithHash};

/// Summary of a successfully validated transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransaction {
    /// Total value of all spent inputs.
    pub total_input: u64,
    /// Total value of all created outputs.
    pub total_output: u64,
    /// `total_input - total_output`.
    pub fee: u64,
}

/// Validate transaction structure (context-free).
///
/// - Non-empty inputs and outputs
/// - All output values are non-zero
/// - Total output value does not overflow
/// - No duplicate input outpoints
pub fn validate_transaction_structure(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        return Err(TransactionError::EmptyInputsOrOutputs);
    }

    for (i, output) in tx.outputs.iter().enumerate() {
        if output.value == 0 {
            return Err(TransactionError::ZeroValueOutput(i));
        }
    }

    if tx.total_output_value().is_none() {
        return Err(TransactionError::ValueOverflow);
    }

    let mut seen = HashSet::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        if !seen.insert(input) {
            return Err(TransactionError::DuplicateInput(input.to_string()));
        }
    }

    Ok(())
}

/// Validate a transaction against a snapshot (contextual).
///
/// Performs the structural checks plus:
/// - Every input references an existing output
/// - None of the transaction's own output references already exist
/// - Total input value covers total output value
///
/// `get_output` looks up an output by reference, so callers can validate
/// against any source. `spent` distinguishes a double spend (the output was
/// consumed earlier in the same batch) from an unknown input.
pub fn validate_transaction<'u, F>(
    tx: &WithHash<Transaction>,
    get_output: F,
    spent: &HashSet<OutPoint>,
) -> Result<ValidatedTransaction, TransactionError>
where
    F: Fn(&OutPoint) -> Option<&'u TxOutput>,
{
    validate_transaction_structure(tx)?;

    let mut total_input: u64 = 0;
    for input in tx.inputs() {
        let output = get_output(input).ok_or_else(|| {
            if spent.contains(input) {
                TransactionError::DoubleSpend(input.to_string())
            } else {
                TransactionError::UnknownInput(input.to_string())
            }
        })?;
        total_input = total_input
            .checked_add(output.value)
            .ok_or(TransactionError::ValueOverflow)?;
    }

    for (outpoint, _) in tx.created_outputs() {
        if get_output(&outpoint).is_some() || spent.contains(&outpoint) {
            return Err(TransactionError::DuplicateOutput(outpoint.to_string()));
        }
    }

    let total_output = tx
        .total_output_value()
        .ok_or(TransactionError::ValueOverflow)?;

    if total_input < total_output {
        return Err(TransactionError::ConservationViolation {
            inputs: total_input,
            outputs: total_output,
        });
    }

    Ok(ValidatedTransaction {
        total_input,
        total_output,
        fee: total_input - total_output,
    })
}

/// The default [`TxVerifier`]: structural and contextual checks, applied
/// transaction by transaction on a running copy of the snapshot.
///
/// A block is accepted whole or rejected at its first invalid transaction.
/// Accepted transactions keep their block order.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtxoVerifier;

impl TxVerifier for UtxoVerifier {
    fn verify_txs(
        &self,
        utxo: &Utxo,
        txs: &[WithHash<Transaction>],
    ) -> Result<Verified, TransactionError> {
        let mut running = utxo.clone();
        let mut spent = HashSet::new();

        for tx in txs {
            validate_transaction(tx, |op| running.get(op), &spent)?;
            spent.extend(tx.inputs().iter().copied());
            running.apply_tx(tx);
        }

        Ok(Verified {
            utxo: running,
            accepted: txs.to_vec(),
        })
    }

    fn check_tx(&self, utxo: &Utxo, tx: &WithHash<Transaction>) -> Result<(), TransactionError> {
        validate_transaction(tx, |op| utxo.get(op), &HashSet::new()).map(|_| ())
    }
}
