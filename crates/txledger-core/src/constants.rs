//! Ledger defaults.

/// Default stability depth `k`: blocks after which a transaction is treated
/// as irreversible.
pub const DEFAULT_STABILITY_DEPTH: usize = 2160;

/// Default number of retained history snapshots.
///
/// A rollback can never reach further back than `k` blocks, so twice that
/// plus the tip leaves room for a full alternate chain at maximum depth.
pub const DEFAULT_MAX_HISTORY: usize = 2 * DEFAULT_STABILITY_DEPTH + 1;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TXLEDGER";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_history_exceeds_stability_depth() {
        assert!(DEFAULT_MAX_HISTORY > DEFAULT_STABILITY_DEPTH);
    }
}
