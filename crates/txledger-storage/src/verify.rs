//! Candidate chain verification.
//!
//! Simulates a rollback followed by a candidate chain on a scratch snapshot.
//! Borrows the history immutably, so it can run under a read lock while
//! other readers are active.

use std::borrow::Cow;

use tracing::{debug, warn};

use txledger_core::error::VerifyError;
use txledger_core::traits::{TxVerifier, Verified};
use txledger_core::types::{AltChain, Block, PerBlockTxs};

use crate::history::History;

/// Verify `chain` as if `to_rollback` blocks had been rolled back first.
///
/// Boundary blocks contribute an empty list and leave the running snapshot
/// as it is. The result has one entry per block, oldest first.
///
/// # Errors
///
/// - [`VerifyError::DepthUnavailable`] if history does not reach `to_rollback`
/// - [`VerifyError::BlockRejected`] for the first block the verifier rejects
pub fn verify_chain<V>(
    verifier: &V,
    history: &History,
    to_rollback: usize,
    chain: &AltChain,
) -> Result<PerBlockTxs, VerifyError>
where
    V: TxVerifier + ?Sized,
{
    let base = history
        .snapshot_at_depth(to_rollback)
        .ok_or(VerifyError::DepthUnavailable {
            requested: to_rollback,
            available: history.len(),
        })?;

    let mut running = Cow::Borrowed(base);
    let mut per_block = Vec::with_capacity(chain.len());

    for block in chain {
        match block {
            Block::Boundary { epoch } => {
                debug!(epoch, "boundary block, no transactions");
                per_block.push(Vec::new());
            }
            Block::Main { slot, transactions } => {
                let Verified { utxo, accepted } = verifier
                    .verify_txs(&running, transactions)
                    .map_err(|source| {
                        warn!(%slot, error = %source, "candidate block rejected");
                        VerifyError::BlockRejected { slot: *slot, source }
                    })?;
                debug!(%slot, txs = accepted.len(), "verified block");
                running = Cow::Owned(utxo);
                per_block.push(accepted);
            }
        }
    }

    Ok(per_block)
}
