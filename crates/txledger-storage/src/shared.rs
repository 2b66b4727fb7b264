//! Shared access to a [`TxStorage`] across threads.
//!
//! Queries take the read lock, so any number may run at once. Mutations take
//! the write lock. [`SharedLedger::adopt_chain`] verifies under an upgradable
//! read, which admits readers but excludes other writers and upgraders, then
//! upgrades to commit. Readers see either the old state or the new one.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use tracing::debug;

use txledger_core::error::LedgerError;
use txledger_core::pending::Reconciled;
use txledger_core::traits::LedgerRead;
use txledger_core::types::{AltChain, Hash256, Transaction, Utxo, WithHash};

use crate::storage::TxStorage;

/// Cloneable handle to a ledger behind a read-write lock.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<RwLock<TxStorage>>,
}

impl SharedLedger {
    pub fn new(storage: TxStorage) -> Self {
        Self { inner: Arc::new(RwLock::new(storage)) }
    }

    /// Shared read-only access.
    pub fn read(&self) -> RwLockReadGuard<'_, TxStorage> {
        self.inner.read()
    }

    /// Exclusive access for [`LedgerWrite`](txledger_core::traits::LedgerWrite) calls.
    pub fn write(&self) -> RwLockWriteGuard<'_, TxStorage> {
        self.inner.write()
    }

    /// Verify `chain` at `to_rollback`, then roll back and commit it.
    ///
    /// Verification runs while readers are still admitted. A rejected chain
    /// returns the verifier's error and the ledger is unchanged.
    pub fn adopt_chain(
        &self,
        pending: &[WithHash<Transaction>],
        to_rollback: usize,
        chain: &AltChain,
    ) -> Result<Reconciled, LedgerError> {
        let guard = self.inner.upgradable_read();
        let per_block = guard.verify_candidate(to_rollback, chain)?;
        debug!(blocks = per_block.len(), to_rollback, "candidate verified, upgrading lock");

        let mut storage = RwLockUpgradableReadGuard::upgrade(guard);
        Ok(storage.commit(to_rollback, per_block, pending))
    }

    /// Copy of the effective UTXO.
    pub fn current_utxo(&self) -> Utxo {
        self.inner.read().current_utxo().clone()
    }

    pub fn balance_of(&self, owner: &Hash256) -> u64 {
        self.inner.read().balance_of(owner)
    }

    pub fn history_len(&self) -> usize {
        self.inner.read().history_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use txledger_core::error::VerifyError;
    use txledger_core::traits::LedgerWrite;
    use txledger_core::types::{Block, OutPoint, SlotId, TxOutput};

    use crate::config::LedgerConfig;

    fn owner(seed: u8) -> Hash256 {
        Hash256([seed; 32])
    }

    fn genesis() -> Utxo {
        (0u8..4)
            .map(|i| (OutPoint::new(Hash256([i + 1; 32]), 0), TxOutput { owner: owner(0xAA), value: 100 }))
            .collect()
    }

    fn ledger() -> SharedLedger {
        SharedLedger::new(
            TxStorage::with_default_verifier(genesis(), LedgerConfig::with_stability_depth(4)).unwrap(),
        )
    }

    fn move_to_bob(seed: u8) -> WithHash<Transaction> {
        Transaction {
            inputs: vec![OutPoint::new(Hash256([seed; 32]), 0)],
            outputs: vec![TxOutput { owner: owner(0xBB), value: 100 }],
        }
        .with_hash()
        .unwrap()
    }

    fn block(slot: u32, txs: Vec<WithHash<Transaction>>) -> AltChain {
        AltChain::single(Block::Main { slot: SlotId::new(0, slot), transactions: txs })
    }

    #[test]
    fn adopt_chain_commits() {
        let l = ledger();
        l.adopt_chain(&[], 0, &block(1, vec![move_to_bob(1)])).unwrap();
        assert_eq!(l.history_len(), 2);
        assert_eq!(l.balance_of(&owner(0xBB)), 100);
    }

    #[test]
    fn adopt_chain_rejection_leaves_state() {
        let l = ledger();
        let before = l.current_utxo();
        let err = l.adopt_chain(&[], 0, &block(1, vec![move_to_bob(9)])).unwrap_err();
        assert!(matches!(err, LedgerError::Verify(VerifyError::BlockRejected { .. })));
        assert_eq!(l.current_utxo(), before);
        assert_eq!(l.history_len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let l = ledger();
        let other = l.clone();
        other.write().apply_chain(&[], &block(1, vec![move_to_bob(2)])).unwrap();
        assert_eq!(l.history_len(), 2);
    }

    #[test]
    fn readers_see_whole_blocks_only() {
        let l = ledger();
        let writer = {
            let l = l.clone();
            thread::spawn(move || {
                for seed in 1..=4u8 {
                    l.adopt_chain(&[], 0, &block(u32::from(seed), vec![move_to_bob(seed)])).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let l = l.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let guard = l.read();
                        let moved = guard.balance_of(&owner(0xBB)) / 100;
                        assert_eq!(moved as usize, guard.history_len() - 1);
                        assert_eq!(guard.current_utxo().total_value(), Some(400));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(l.balance_of(&owner(0xBB)), 400);
        assert_eq!(l.history_len(), 5);
    }
}
