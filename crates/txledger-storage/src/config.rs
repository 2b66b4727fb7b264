//! Ledger configuration.
//!
//! [`LedgerConfig`] holds the stability depth `k` and the history retention
//! limit. Values are layered: built-in defaults, then an optional TOML file,
//! then `TXLEDGER_*` environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use txledger_core::constants::{DEFAULT_MAX_HISTORY, DEFAULT_STABILITY_DEPTH, ENV_PREFIX};
use txledger_core::error::LedgerError;

/// Configuration for a [`TxStorage`](crate::TxStorage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Blocks after which a transaction is treated as irreversible.
    pub stability_depth: usize,
    /// Maximum number of history snapshots retained; oldest are pruned.
    pub max_history: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            stability_depth: DEFAULT_STABILITY_DEPTH,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl LedgerConfig {
    /// A config with stability depth `k` and retention derived from it.
    pub fn with_stability_depth(k: usize) -> Self {
        Self {
            stability_depth: k,
            max_history: 2 * k + 1,
        }
    }

    /// Check the values are usable together.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Config`] if `stability_depth` is zero
    /// - [`LedgerError::Config`] if `max_history` does not exceed `stability_depth`,
    ///   which would leave the snapshot at depth `k` never retained
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.stability_depth == 0 {
            return Err(LedgerError::Config("stability_depth must be positive".into()));
        }
        if self.max_history <= self.stability_depth {
            return Err(LedgerError::Config(format!(
                "max_history ({}) must exceed stability_depth ({})",
                self.max_history, self.stability_depth
            )));
        }
        Ok(())
    }

    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// The file format is chosen from its extension (`.toml`, `.json`, ...).
    /// Environment variables use the `TXLEDGER_` prefix, e.g.
    /// `TXLEDGER_STABILITY_DEPTH=10`.
    pub fn load(path: Option<&Path>) -> Result<Self, LedgerError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("stability_depth", defaults.stability_depth as u64)
            .and_then(|b| b.set_default("max_history", defaults.max_history as u64))
            .map_err(|e| LedgerError::Config(e.to_string()))?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let cfg: Self = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| LedgerError::Config(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }
}
