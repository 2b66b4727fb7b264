//! History stack: one confirmed UTXO snapshot per block, newest first.
//!
//! The head is stored apart from older entries so the stack can never be
//! empty. Depth 0 is the head; depth `n` is the state `n` blocks earlier.

use std::collections::VecDeque;

use txledger_core::error::LedgerError;
use txledger_core::types::Utxo;

/// Ordered stack of confirmed snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct History {
    /// Snapshot after the most recent confirmed block.
    head: Utxo,
    /// Older snapshots, `older[0]` one block behind the head.
    older: VecDeque<Utxo>,
    /// Height of the head block, genesis being 0.
    tip_height: u64,
}

impl History {
    /// Start a history from the genesis snapshot.
    pub fn new(genesis: Utxo) -> Self {
        Self {
            head: genesis,
            older: VecDeque::new(),
            tip_height: 0,
        }
    }

    /// Rebuild from snapshots ordered newest first.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EmptyHistory`] if `snapshots` is empty
    /// - [`LedgerError::Persistence`] if there are more snapshots than
    ///   heights from genesis to `tip_height`
    pub fn from_snapshots(tip_height: u64, snapshots: Vec<Utxo>) -> Result<Self, LedgerError> {
        if snapshots.len() as u64 > tip_height.saturating_add(1) {
            return Err(LedgerError::Persistence(format!(
                "{} snapshots cannot end at height {tip_height}",
                snapshots.len()
            )));
        }
        let mut older: VecDeque<Utxo> = snapshots.into();
        let head = older.pop_front().ok_or(LedgerError::EmptyHistory)?;
        Ok(Self {
            head,
            older,
            tip_height,
        })
    }

    /// The newest snapshot.
    pub fn head(&self) -> &Utxo {
        &self.head
    }

    /// Number of retained snapshots (always at least one).
    pub fn len(&self) -> usize {
        self.older.len() + 1
    }

    /// Always false: a history holds at least its head.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Height of the block the head snapshot follows.
    pub fn tip_height(&self) -> u64 {
        self.tip_height
    }

    /// Snapshot `depth` blocks behind the tip, or `None` if not retained.
    pub fn snapshot_at_depth(&self, depth: usize) -> Option<&Utxo> {
        match depth {
            0 => Some(&self.head),
            d => self.older.get(d - 1),
        }
    }

    /// Push a new head.
    pub fn push(&mut self, snapshot: Utxo) {
        let previous = std::mem::replace(&mut self.head, snapshot);
        self.older.push_front(previous);
        self.tip_height += 1;
    }

    /// Discard the `n` newest snapshots.
    ///
    /// Returns `false` and leaves the history untouched if that would
    /// remove every snapshot.
    pub fn drop_newest(&mut self, n: usize) -> bool {
        if n == 0 {
            return true;
        }
        if n >= self.len() {
            return false;
        }
        if let Some(new_head) = self.older.drain(..n).last() {
            self.head = new_head;
        }
        self.tip_height = self.tip_height.saturating_sub(n as u64);
        true
    }

    /// Keep at most `max` snapshots (never fewer than one), dropping the oldest.
    ///
    /// Returns the number of snapshots removed.
    pub fn prune_to(&mut self, max: usize) -> usize {
        let keep_older = max.max(1) - 1;
        let removed = self.older.len().saturating_sub(keep_older);
        self.older.truncate(keep_older);
        removed
    }

    /// Snapshots newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Utxo> {
        std::iter::once(&self.head).chain(self.older.iter())
    }

    /// Snapshots newest first, cloned into a vector.
    pub fn to_vec(&self) -> Vec<Utxo> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use txledger_core::types::{Hash256, OutPoint, TxOutput};

    /// A distinguishable snapshot holding a single output of `value`.
    fn snap(value: u64) -> Utxo {
        [(
            OutPoint::new(Hash256([value as u8; 32]), 0),
            TxOutput { owner: Hash256::ZERO, value },
        )]
        .into_iter()
        .collect()
    }

    fn history_of(values: &[u64]) -> History {
        let mut h = History::new(snap(values[0]));
        for v in &values[1..] {
            h.push(snap(*v));
        }
        h
    }

    #[test]
    fn new_history_has_only_genesis() {
        let h = History::new(snap(1));
        assert_eq!(h.len(), 1);
        assert!(!h.is_empty());
        assert_eq!(h.tip_height(), 0);
        assert_eq!(h.head(), &snap(1));
        assert_eq!(h.snapshot_at_depth(0), Some(&snap(1)));
        assert_eq!(h.snapshot_at_depth(1), None);
    }

    #[test]
    fn push_makes_new_head() {
        let h = history_of(&[1, 2, 3]);
        assert_eq!(h.len(), 3);
        assert_eq!(h.tip_height(), 2);
        assert_eq!(h.head(), &snap(3));
        assert_eq!(h.snapshot_at_depth(1), Some(&snap(2)));
        assert_eq!(h.snapshot_at_depth(2), Some(&snap(1)));
        assert_eq!(h.snapshot_at_depth(3), None);
    }

    #[test]
    fn drop_newest_restores_older_head() {
        let mut h = history_of(&[1, 2, 3, 4]);
        assert!(h.drop_newest(2));
        assert_eq!(h.len(), 2);
        assert_eq!(h.head(), &snap(2));
        assert_eq!(h.tip_height(), 1);
        assert_eq!(h.snapshot_at_depth(1), Some(&snap(1)));
    }

    #[test]
    fn drop_newest_zero_is_noop() {
        let mut h = history_of(&[1, 2]);
        let before = h.clone();
        assert!(h.drop_newest(0));
        assert_eq!(h, before);
    }

    #[test]
    fn drop_newest_refuses_to_empty() {
        let mut h = history_of(&[1, 2]);
        let before = h.clone();
        assert!(!h.drop_newest(2));
        assert!(!h.drop_newest(10));
        assert_eq!(h, before);
    }

    #[test]
    fn prune_drops_oldest_only() {
        let mut h = history_of(&[1, 2, 3, 4, 5]);
        assert_eq!(h.prune_to(3), 2);
        assert_eq!(h.len(), 3);
        assert_eq!(h.head(), &snap(5));
        assert_eq!(h.snapshot_at_depth(2), Some(&snap(3)));
        assert_eq!(h.tip_height(), 4);
    }

    #[test]
    fn prune_never_removes_head() {
        let mut h = history_of(&[1, 2, 3]);
        assert_eq!(h.prune_to(0), 2);
        assert_eq!(h.len(), 1);
        assert_eq!(h.head(), &snap(3));
    }

    #[test]
    fn prune_within_limit_is_noop() {
        let mut h = history_of(&[1, 2]);
        assert_eq!(h.prune_to(10), 0);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn iter_is_newest_first() {
        let h = history_of(&[1, 2, 3]);
        assert_eq!(h.to_vec(), vec![snap(3), snap(2), snap(1)]);
    }

    #[test]
    fn from_snapshots_roundtrip() {
        let h = history_of(&[1, 2, 3]);
        let rebuilt = History::from_snapshots(h.tip_height(), h.to_vec()).unwrap();
        assert_eq!(rebuilt, h);
    }

    #[test]
    fn from_snapshots_rejects_empty() {
        assert!(matches!(
            History::from_snapshots(0, vec![]),
            Err(LedgerError::EmptyHistory)
        ));
    }

    #[test]
    fn from_snapshots_rejects_more_snapshots_than_heights() {
        let err = History::from_snapshots(0, vec![snap(3), snap(2), snap(1)]).unwrap_err();
        assert!(matches!(err, LedgerError::Persistence(_)), "{err}");
        assert!(History::from_snapshots(1, vec![snap(3), snap(2), snap(1)]).is_err());
    }

    #[test]
    fn from_snapshots_accepts_pruned_history() {
        let h = History::from_snapshots(5, vec![snap(3), snap(2), snap(1)]).unwrap();
        assert_eq!(h.len(), 3);
        assert_eq!(h.tip_height(), 5);
        assert!(History::from_snapshots(u64::MAX, vec![snap(1)]).is_ok());
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn depth_lookup_matches_len(pushes in 0u64..20, max in 1usize..10) {
            let mut h = History::new(snap(0));
            for v in 1..=pushes {
                h.push(snap(v));
                h.prune_to(max);
            }
            prop_assert!(h.len() <= max);
            prop_assert_eq!(h.tip_height(), pushes);
            for depth in 0..max + 2 {
                prop_assert_eq!(h.snapshot_at_depth(depth).is_some(), depth < h.len());
            }
        }

        #[test]
        fn push_then_drop_restores(base in 1u64..8, extra in 1usize..8) {
            let values: Vec<u64> = (0..base).collect();
            let mut h = history_of(&values);
            let before = h.clone();
            for v in 0..extra {
                h.push(snap(100 + v as u64));
            }
            prop_assert!(h.drop_newest(extra));
            prop_assert_eq!(h, before);
        }
    }
}
