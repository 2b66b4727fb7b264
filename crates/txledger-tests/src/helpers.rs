//! Shared helpers for integration and property tests.

use std::sync::Arc;

use txledger_core::traits::TxVerifier;
use txledger_core::types::*;
use txledger_storage::{LedgerConfig, TxStorage};

/// Simple owner key from a seed byte.
pub fn pkh(seed: u8) -> Hash256 {
    Hash256([seed; 32])
}

/// Txid shared by all genesis outputs.
pub fn genesis_txid() -> Hash256 {
    Hash256([0x01; 32])
}

/// Genesis output `index`.
pub fn genesis_op(index: u32) -> OutPoint {
    OutPoint::new(genesis_txid(), index)
}

/// A genesis snapshot of `n` outputs, each of `value`, all owned by `owner`.
pub fn genesis_utxo(n: u32, value: u64, owner: Hash256) -> Utxo {
    (0..n)
        .map(|i| (genesis_op(i), TxOutput { owner, value }))
        .collect()
}

/// Create a hashed transaction.
pub fn make_tx(inputs: Vec<OutPoint>, outputs: Vec<(u64, Hash256)>) -> WithHash<Transaction> {
    Transaction {
        inputs,
        outputs: outputs
            .into_iter()
            .map(|(value, owner)| TxOutput { owner, value })
            .collect(),
    }
    .with_hash()
    .unwrap()
}

/// Output `index` of `tx`.
pub fn out(tx: &WithHash<Transaction>, index: u32) -> OutPoint {
    OutPoint::new(tx.hash(), index)
}

pub fn main_block(slot: u32, txs: Vec<WithHash<Transaction>>) -> Block {
    Block::Main {
        slot: SlotId::new(0, slot),
        transactions: txs,
    }
}

pub fn chain(blocks: Vec<Block>) -> AltChain {
    AltChain::new(blocks).unwrap()
}

/// Ledger over `genesis` with stability depth `k` and the built-in verifier.
pub fn storage(genesis: Utxo, k: usize) -> TxStorage {
    TxStorage::with_default_verifier(genesis, LedgerConfig::with_stability_depth(k)).unwrap()
}

/// Ledger over `genesis` with a caller-supplied verifier.
pub fn storage_with(genesis: Utxo, k: usize, verifier: Arc<dyn TxVerifier>) -> TxStorage {
    TxStorage::new(genesis, LedgerConfig::with_stability_depth(k), verifier).unwrap()
}

/// Build a valid chain on top of `start` from a plan.
///
/// Each plan entry is one block. An empty entry becomes a boundary block;
/// otherwise every index picks an unspent output (modulo the current set
/// size, duplicates ignored) and moves it whole to `owner`.
///
/// Returns the chain and the snapshot after it.
pub fn build_chain(start: &Utxo, plan: &[Vec<usize>], owner: Hash256) -> (AltChain, Utxo) {
    let mut running = start.clone();
    let mut blocks = Vec::with_capacity(plan.len());

    for (slot, picks) in plan.iter().enumerate() {
        if picks.is_empty() || running.is_empty() {
            blocks.push(Block::Boundary { epoch: slot as u64 + 1 });
            continue;
        }

        let keys: Vec<OutPoint> = running.iter().map(|(op, _)| *op).collect();
        let mut chosen: Vec<OutPoint> = picks.iter().map(|i| keys[i % keys.len()]).collect();
        chosen.sort();
        chosen.dedup();

        let txs: Vec<WithHash<Transaction>> = chosen
            .into_iter()
            .filter_map(|op| running.get(&op).map(|o| make_tx(vec![op], vec![(o.value, owner)])))
            .collect();
        running.apply_all(&txs);
        blocks.push(main_block(slot as u32 + 1, txs));
    }

    (chain(blocks), running)
}

/// Pending transactions spending genesis outputs to `owner`, with a child
/// for every other one. Children are placed before their parents.
pub fn build_pending(genesis_picks: &[u32], value: u64, owner: Hash256) -> Vec<WithHash<Transaction>> {
    let mut pending = Vec::new();
    for (n, index) in genesis_picks.iter().enumerate() {
        let parent = make_tx(vec![genesis_op(*index)], vec![(value, owner)]);
        if n % 2 == 0 {
            pending.push(make_tx(vec![out(&parent, 0)], vec![(value, owner)]));
        }
        pending.push(parent);
    }
    pending
}
