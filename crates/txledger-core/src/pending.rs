//! Pending-transaction reconciliation.
//!
//! After every change to the confirmed state the effective UTXO is rebuilt
//! from scratch: start from the confirmed head, then apply whichever pending
//! transactions still verify. Nothing is carried forward incrementally.
//!
//! Ordering is stable. A pending transaction is moved after any pending
//! parent whose output it spends; otherwise the caller's order is kept, and
//! of two conflicting transactions the earlier one survives.

use std::collections::HashMap;

use tracing::debug;

use crate::traits::TxVerifier;
use crate::types::{Hash256, Transaction, Utxo, WithHash};

/// Result of reconciling a pending list against a confirmed snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Transactions still applicable, in the order they were applied.
    pub kept: Vec<WithHash<Transaction>>,
    /// Hashes of transactions dropped because they no longer verify.
    pub dropped: Vec<Hash256>,
}

impl Reconciled {
    /// Everything kept, nothing dropped.
    pub fn unchanged(pending: &[WithHash<Transaction>]) -> Self {
        Self {
            kept: pending.to_vec(),
            dropped: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Stable topological order of `pending`, as indices into it.
///
/// Parents (pending transactions whose outputs another pending transaction
/// spends) come first; ties keep input order. Cycles cannot be built from
/// content hashes, but a malformed list containing one is still ordered
/// without looping.
pub fn normalize(pending: &[WithHash<Transaction>]) -> Vec<usize> {
    let mut by_hash: HashMap<Hash256, usize> = HashMap::with_capacity(pending.len());
    for (idx, tx) in pending.iter().enumerate() {
        by_hash.entry(tx.hash()).or_insert(idx);
    }

    let mut marks = vec![Mark::Unvisited; pending.len()];
    let mut order = Vec::with_capacity(pending.len());

    for root in 0..pending.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        let mut stack = vec![(root, 0usize)];

        while let Some(top) = stack.last_mut() {
            let (idx, cursor) = *top;
            let inputs = pending[idx].inputs();
            if cursor < inputs.len() {
                top.1 += 1;
                if let Some(&parent) = by_hash.get(&inputs[cursor].txid) {
                    if marks[parent] == Mark::Unvisited {
                        marks[parent] = Mark::InProgress;
                        stack.push((parent, 0));
                    }
                }
            } else {
                marks[idx] = Mark::Done;
                order.push(idx);
                stack.pop();
            }
        }
    }

    order
}

/// Rebuild the effective UTXO from `confirmed` plus `pending`.
///
/// Returns the effective snapshot and which pending transactions survived.
pub fn reconcile<V>(
    verifier: &V,
    confirmed: &Utxo,
    pending: &[WithHash<Transaction>],
) -> (Utxo, Reconciled)
where
    V: TxVerifier + ?Sized,
{
    let mut running = confirmed.clone();
    let mut outcome = Reconciled::default();

    for idx in normalize(pending) {
        let tx = &pending[idx];
        match verifier.check_tx(&running, tx) {
            Ok(()) => {
                running.apply_tx(tx);
                outcome.kept.push(tx.clone());
            }
            Err(e) => {
                debug!(txid = %tx.hash(), error = %e, "dropping pending transaction");
                outcome.dropped.push(tx.hash());
            }
        }
    }

    (running, outcome)
}

/// The maximal ordered sublist of `pending` applicable on top of `confirmed`.
pub fn filter_pending<V>(
    verifier: &V,
    confirmed: &Utxo,
    pending: &[WithHash<Transaction>],
) -> Vec<WithHash<Transaction>>
where
    V: TxVerifier + ?Sized,
{
    reconcile(verifier, confirmed, pending).1.kept
}
