//! Trait interfaces for the ledger.
//!
//! - [`TxVerifier`]: transaction validity against a snapshot (supplied by the node)
//! - [`LedgerRead`]: read-only queries (txledger-storage implements)
//! - [`LedgerWrite`]: mutating operations (txledger-storage implements)
//!
//! Callers take the narrowest capability they need: a fork-choice component
//! that only decides whether to switch takes `&dyn LedgerRead`.

use crate::error::{ContractViolation, LedgerError, TransactionError, VerifyError};
use crate::pending::Reconciled;
use crate::types::{AltChain, Hash256, PerBlockTxs, Transaction, Utxo, WithHash};

/// Outcome of verifying one block's transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verified {
    /// Snapshot after applying `accepted` in order.
    pub utxo: Utxo,
    /// The transactions accepted for the block, in application order.
    pub accepted: Vec<WithHash<Transaction>>,
}

/// Validates transactions against a UTXO snapshot.
///
/// Implementations must be pure: the same snapshot and transactions always
/// produce the same outcome, and `Verified::utxo` must equal the input
/// snapshot with [`Utxo::apply_all`] of `Verified::accepted`.
pub trait TxVerifier: Send + Sync {
    /// Verify and apply a block's transactions atomically.
    ///
    /// On failure nothing is applied and the rejection cause is returned.
    fn verify_txs(
        &self,
        utxo: &Utxo,
        txs: &[WithHash<Transaction>],
    ) -> Result<Verified, TransactionError>;

    /// Check a single transaction without producing a new snapshot.
    ///
    /// Default implementation delegates to [`verify_txs`](Self::verify_txs).
    fn check_tx(&self, utxo: &Utxo, tx: &WithHash<Transaction>) -> Result<(), TransactionError> {
        self.verify_txs(utxo, std::slice::from_ref(tx)).map(|_| ())
    }
}

/// Read-only view of the ledger.
///
/// Snapshots are returned by shared reference, so they cannot change while
/// the caller holds them.
pub trait LedgerRead {
    /// The effective UTXO: confirmed head plus accepted pending transactions.
    fn current_utxo(&self) -> &Utxo;

    /// Confirmed snapshot `depth` blocks behind the tip. `None` if not retained.
    fn utxo_at_depth(&self, depth: usize) -> Option<&Utxo>;

    /// Number of retained history snapshots.
    fn history_len(&self) -> usize;

    /// The configured stability depth `k`.
    fn stability_depth(&self) -> usize;

    /// Whether `tx` verifies against the snapshot `k` blocks deep.
    ///
    /// False while history holds `k` or fewer snapshots.
    fn is_confirmed(&self, tx: &WithHash<Transaction>) -> bool;

    /// Check a transaction against the effective UTXO.
    fn verify_tx(&self, tx: &WithHash<Transaction>) -> Result<(), TransactionError>;

    /// Simulate a rollback of `to_rollback` blocks followed by `chain`.
    ///
    /// Returns the accepted transactions of every block, oldest first.
    /// Never mutates the ledger.
    fn verify_chain(&self, to_rollback: usize, chain: &AltChain) -> Result<PerBlockTxs, VerifyError>;

    /// Balance of `owner` in the effective UTXO.
    ///
    /// Default implementation scans [`current_utxo`](Self::current_utxo).
    fn balance_of(&self, owner: &Hash256) -> u64 {
        self.current_utxo().balance_of(owner)
    }
}

/// Mutating operations. Require exclusive access.
pub trait LedgerWrite: LedgerRead {
    /// Commit a chain directly on top of the current tip.
    ///
    /// The chain must already have passed [`LedgerRead::verify_chain`] with
    /// `to_rollback = 0`. Pending transactions invalidated by the new blocks
    /// are reported in [`Reconciled::dropped`].
    fn apply_chain(
        &mut self,
        pending: &[WithHash<Transaction>],
        chain: &AltChain,
    ) -> Result<Reconciled, ContractViolation>;

    /// Revert the confirmed state by exactly `depth` blocks.
    fn rollback(
        &mut self,
        pending: &[WithHash<Transaction>],
        depth: usize,
    ) -> Result<Reconciled, ContractViolation>;

    /// Apply an already-validated pending transaction to the effective UTXO.
    fn process_tx(&mut self, tx: &WithHash<Transaction>);

    /// Validate a new pending transaction against the effective UTXO, then apply it.
    ///
    /// Default implementation: [`verify_tx`](LedgerRead::verify_tx) then
    /// [`process_tx`](Self::process_tx).
    fn admit_tx(&mut self, tx: &WithHash<Transaction>) -> Result<(), TransactionError> {
        self.verify_tx(tx)?;
        self.process_tx(tx);
        Ok(())
    }

    /// Verify a candidate chain at `to_rollback`, then roll back and apply it
    /// as one step. A rejected chain is an ordinary error and changes nothing.
    fn switch_chain(
        &mut self,
        pending: &[WithHash<Transaction>],
        to_rollback: usize,
        chain: &AltChain,
    ) -> Result<Reconciled, LedgerError>;
}
