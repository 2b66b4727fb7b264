//! The ledger aggregate.
//!
//! [`TxStorage`] owns the history stack and the effective UTXO and is the
//! only implementor of [`LedgerRead`] and [`LedgerWrite`] in this crate.
//!
//! Every mutating path first runs all fallible checks against borrowed state,
//! then performs infallible mutations. A failed call leaves the history and
//! the effective UTXO exactly as they were.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use txledger_core::error::{ContractViolation, LedgerError, TransactionError, VerifyError};
use txledger_core::pending::{self, Reconciled};
use txledger_core::traits::{LedgerRead, LedgerWrite, TxVerifier};
use txledger_core::types::{AltChain, PerBlockTxs, Transaction, Utxo, WithHash};
use txledger_core::validation::UtxoVerifier;

use crate::config::LedgerConfig;
use crate::history::History;
use crate::persist::PersistedHistory;
use crate::verify;

/// Confirmed history plus the effective UTXO built from it.
pub struct TxStorage {
    history: History,
    /// History head with accepted pending transactions applied.
    utxo: Utxo,
    config: LedgerConfig,
    verifier: Arc<dyn TxVerifier>,
}

impl fmt::Debug for TxStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxStorage")
            .field("history_len", &self.history.len())
            .field("tip_height", &self.history.tip_height())
            .field("utxo_len", &self.utxo.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TxStorage {
    /// Create a ledger whose history holds only `genesis`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Config`] if `config` fails validation
    pub fn new(
        genesis: Utxo,
        config: LedgerConfig,
        verifier: Arc<dyn TxVerifier>,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        info!(
            outputs = genesis.len(),
            stability_depth = config.stability_depth,
            max_history = config.max_history,
            "ledger initialised from genesis"
        );
        Ok(Self {
            utxo: genesis.clone(),
            history: History::new(genesis),
            config,
            verifier,
        })
    }

    /// [`new`](Self::new) with the built-in [`UtxoVerifier`].
    pub fn with_default_verifier(genesis: Utxo, config: LedgerConfig) -> Result<Self, LedgerError> {
        Self::new(genesis, config, Arc::new(UtxoVerifier))
    }

    /// Rebuild a ledger from persisted history and reconcile `pending` on top.
    ///
    /// History beyond `config.max_history` is pruned on load.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Config`] if `config` fails validation
    /// - [`LedgerError::EmptyHistory`] if the persisted history has no snapshots
    /// - [`LedgerError::Persistence`] if it holds more snapshots than heights
    pub fn restore(
        persisted: PersistedHistory,
        config: LedgerConfig,
        verifier: Arc<dyn TxVerifier>,
        pending: &[WithHash<Transaction>],
    ) -> Result<(Self, Reconciled), LedgerError> {
        config.validate()?;
        let mut history = persisted.into_history()?;
        let pruned = history.prune_to(config.max_history);

        let mut storage = Self {
            utxo: history.head().clone(),
            history,
            config,
            verifier,
        };
        let reconciled = storage.override_with_pending(pending);
        info!(
            height = storage.history.tip_height(),
            snapshots = storage.history.len(),
            pruned,
            kept = reconciled.kept.len(),
            dropped = reconciled.dropped.len(),
            "ledger restored"
        );
        Ok((storage, reconciled))
    }

    /// Snapshot the history for persistence.
    pub fn persisted(&self) -> PersistedHistory {
        PersistedHistory::from_history(&self.history)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Height of the newest confirmed block.
    pub fn tip_height(&self) -> u64 {
        self.history.tip_height()
    }

    /// Discard all pending effects: effective UTXO becomes the history head.
    pub fn reset_effective(&mut self) {
        self.utxo = self.history.head().clone();
    }

    /// Rebuild the effective UTXO from the history head and `pending`.
    ///
    /// Transactions that no longer verify are left out and reported in
    /// [`Reconciled::dropped`].
    pub fn override_with_pending(&mut self, pending: &[WithHash<Transaction>]) -> Reconciled {
        self.reset_effective();
        let (utxo, reconciled) = pending::reconcile(self.verifier.as_ref(), &self.utxo, pending);
        self.utxo = utxo;
        reconciled
    }

    /// Verify a candidate chain without borrowing the whole aggregate.
    pub(crate) fn verify_candidate(
        &self,
        to_rollback: usize,
        chain: &AltChain,
    ) -> Result<PerBlockTxs, VerifyError> {
        verify::verify_chain(self.verifier.as_ref(), &self.history, to_rollback, chain)
    }

    /// Roll back `to_rollback` blocks and push one snapshot per verified block.
    ///
    /// `per_block` must come from verifying the chain at `to_rollback` against
    /// the current history, so every step here is infallible.
    pub(crate) fn commit(
        &mut self,
        to_rollback: usize,
        per_block: PerBlockTxs,
        pending: &[WithHash<Transaction>],
    ) -> Reconciled {
        let rolled_back = self.history.drop_newest(to_rollback);
        debug_assert!(rolled_back, "verified depth must be retained");

        let blocks = per_block.len();
        let mut running = self.history.head().clone();
        for txs in &per_block {
            running.apply_all(txs);
            self.history.push(running.clone());
        }
        let pruned = self.history.prune_to(self.config.max_history);
        let reconciled = self.override_with_pending(pending);

        info!(
            blocks,
            rolled_back = to_rollback,
            height = self.history.tip_height(),
            pruned,
            dropped = reconciled.dropped.len(),
            "chain committed"
        );
        reconciled
    }
}

impl LedgerRead for TxStorage {
    fn current_utxo(&self) -> &Utxo {
        &self.utxo
    }

    fn utxo_at_depth(&self, depth: usize) -> Option<&Utxo> {
        self.history.snapshot_at_depth(depth)
    }

    fn history_len(&self) -> usize {
        self.history.len()
    }

    fn stability_depth(&self) -> usize {
        self.config.stability_depth
    }

    fn is_confirmed(&self, tx: &WithHash<Transaction>) -> bool {
        self.history
            .snapshot_at_depth(self.config.stability_depth)
            .is_some_and(|stable| self.verifier.check_tx(stable, tx).is_ok())
    }

    fn verify_tx(&self, tx: &WithHash<Transaction>) -> Result<(), TransactionError> {
        self.verifier.check_tx(&self.utxo, tx)
    }

    fn verify_chain(&self, to_rollback: usize, chain: &AltChain) -> Result<PerBlockTxs, VerifyError> {
        self.verify_candidate(to_rollback, chain)
    }
}

impl LedgerWrite for TxStorage {
    fn apply_chain(
        &mut self,
        pending: &[WithHash<Transaction>],
        chain: &AltChain,
    ) -> Result<Reconciled, ContractViolation> {
        let per_block = self.verify_candidate(0, chain).map_err(|source| {
            error!(error = %source, "apply_chain on a chain that does not verify at the tip");
            ContractViolation::UnverifiedChain { source }
        })?;
        Ok(self.commit(0, per_block, pending))
    }

    fn rollback(
        &mut self,
        pending: &[WithHash<Transaction>],
        depth: usize,
    ) -> Result<Reconciled, ContractViolation> {
        if depth == 0 {
            return Ok(Reconciled::unchanged(pending));
        }
        if self.history.snapshot_at_depth(depth).is_none() {
            let available = self.history.len();
            error!(requested = depth, available, "rollback past retained history");
            return Err(ContractViolation::RollbackPastHistory { requested: depth, available });
        }

        self.history.drop_newest(depth);
        let reconciled = self.override_with_pending(pending);
        info!(
            depth,
            height = self.history.tip_height(),
            dropped = reconciled.dropped.len(),
            "rolled back"
        );
        Ok(reconciled)
    }

    fn process_tx(&mut self, tx: &WithHash<Transaction>) {
        self.utxo.apply_tx(tx);
        debug!(txid = %tx.hash(), "pending transaction applied");
    }

    fn switch_chain(
        &mut self,
        pending: &[WithHash<Transaction>],
        to_rollback: usize,
        chain: &AltChain,
    ) -> Result<Reconciled, LedgerError> {
        let per_block = self.verify_candidate(to_rollback, chain)?;
        Ok(self.commit(to_rollback, per_block, pending))
    }
}
