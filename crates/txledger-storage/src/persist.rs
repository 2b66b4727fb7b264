//! On-disk form of the history stack.
//!
//! Only confirmed snapshots are stored. The effective UTXO is derived and is
//! rebuilt from the head plus the caller's pending list on restore.
//!
//! # File format
//! ```text
//! bincode(PersistedHistory { magic, version, tip_height, snapshots })
//! ```
//! Written to a sibling temp file first, then renamed over the target.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use txledger_core::error::LedgerError;
use txledger_core::types::Utxo;

use crate::history::History;

/// Magic bytes identifying a txledger history file.
pub const HISTORY_MAGIC: [u8; 4] = *b"TXLH";

/// Current history file version.
pub const HISTORY_VERSION: u32 = 1;

/// Upper bound on bytes read or allocated while decoding a history file.
pub const MAX_HISTORY_BYTES: usize = 256 * 1024 * 1024;

/// Serializable history: snapshots newest first.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct PersistedHistory {
    pub magic: [u8; 4],
    pub version: u32,
    /// Height of the newest snapshot.
    pub tip_height: u64,
    pub snapshots: Vec<Utxo>,
}

impl PersistedHistory {
    /// Capture a history stack.
    pub fn from_history(history: &History) -> Self {
        Self {
            magic: HISTORY_MAGIC,
            version: HISTORY_VERSION,
            tip_height: history.tip_height(),
            snapshots: history.to_vec(),
        }
    }

    /// Rebuild the history stack.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EmptyHistory`] if no snapshots were stored
    pub fn into_history(self) -> Result<History, LedgerError> {
        History::from_snapshots(self.tip_height, self.snapshots)
    }

    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| LedgerError::Persistence(e.to_string()))
    }

    /// Decode and check the header.
    ///
    /// Length prefixes are checked against [`MAX_HISTORY_BYTES`] before
    /// anything is allocated, so corrupt input is an error, never an abort.
    pub fn decode(bytes: &[u8]) -> Result<Self, LedgerError> {
        if bytes.len() > MAX_HISTORY_BYTES {
            return Err(LedgerError::Persistence(format!(
                "history of {} bytes exceeds limit of {MAX_HISTORY_BYTES}",
                bytes.len()
            )));
        }
        let config = bincode::config::standard().with_limit::<MAX_HISTORY_BYTES>();
        let (persisted, read): (Self, usize) = bincode::decode_from_slice(bytes, config)
            .map_err(|e| LedgerError::Persistence(format!("invalid history: {e}")))?;

        if persisted.magic != HISTORY_MAGIC {
            return Err(LedgerError::Persistence("invalid magic bytes".into()));
        }
        if persisted.version != HISTORY_VERSION {
            return Err(LedgerError::Persistence(format!(
                "unsupported version: {}",
                persisted.version
            )));
        }
        if read != bytes.len() {
            return Err(LedgerError::Persistence(format!(
                "{} trailing bytes",
                bytes.len() - read
            )));
        }
        Ok(persisted)
    }

    /// Write to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<(), LedgerError> {
        let bytes = self.encode()?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "history written");
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, LedgerError> {
        let size = std::fs::metadata(path)?.len();
        if size > MAX_HISTORY_BYTES as u64 {
            return Err(LedgerError::Persistence(format!(
                "history file of {size} bytes exceeds limit of {MAX_HISTORY_BYTES}"
            )));
        }
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }
}
