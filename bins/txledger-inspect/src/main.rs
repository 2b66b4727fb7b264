//! txledger-inspect: read-only inspector for persisted ledger history.
//!
//! Loads a history file written by `PersistedHistory::write_to`, restores a
//! ledger from it under the configured retention, and prints summaries,
//! snapshots, or balances as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info};

use txledger_core::traits::LedgerRead;
use txledger_core::types::{Hash256, Utxo};
use txledger_core::validation::UtxoVerifier;
use txledger_storage::{LedgerConfig, PersistedHistory, TxStorage};

/// Inspect a txledger history file.
#[derive(Parser)]
#[command(name = "txledger-inspect")]
#[command(version, about = "Inspect persisted UTXO history")]
struct Cli {
    /// History file (default: ~/.txledger/history.bin).
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Ledger config file (TOML). TXLEDGER_* environment variables also apply.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level filter, overridden by RUST_LOG.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise the history: height, retained snapshots, per-depth totals.
    Info,
    /// List the outputs of the snapshot at a given depth.
    Utxo(UtxoArgs),
    /// Balance of an owner at a given depth.
    Balance(BalanceArgs),
}

#[derive(Args)]
struct UtxoArgs {
    /// Blocks behind the tip (0 = newest).
    #[arg(short, long, default_value = "0")]
    depth: usize,
}

#[derive(Args)]
struct BalanceArgs {
    /// Owner key, 64 hex characters.
    #[arg(short, long)]
    owner: String,

    /// Blocks behind the tip (0 = newest).
    #[arg(short, long, default_value = "0")]
    depth: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let ledger = load_ledger(cli.file, cli.config)?;

    let output = match cli.command {
        Commands::Info => info_json(&ledger),
        Commands::Utxo(args) => utxo_json(&ledger, args.depth)?,
        Commands::Balance(args) => balance_json(&ledger, &args)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_ledger(file: Option<PathBuf>, config: Option<PathBuf>) -> Result<TxStorage> {
    let path = resolve_history_path(file)?;
    let config = LedgerConfig::load(config.as_deref()).context("Failed to load ledger config")?;
    debug!(?config, "config loaded");

    let persisted = PersistedHistory::read_from(&path)
        .with_context(|| format!("Failed to read history from {}", path.display()))?;
    let stored = persisted.snapshots.len();

    let (ledger, _) = TxStorage::restore(persisted, config, Arc::new(UtxoVerifier), &[])
        .context("Failed to restore ledger")?;
    info!(
        path = %path.display(),
        stored,
        retained = ledger.history_len(),
        height = ledger.tip_height(),
        "history loaded"
    );
    Ok(ledger)
}

fn info_json(ledger: &TxStorage) -> serde_json::Value {
    let snapshots: Vec<serde_json::Value> = ledger
        .history()
        .iter()
        .enumerate()
        .map(|(depth, utxo)| {
            json!({
                "depth": depth,
                "height": ledger.tip_height().saturating_sub(depth as u64),
                "outputs": utxo.len(),
                "total_value": utxo.total_value(),
            })
        })
        .collect();

    json!({
        "tip_height": ledger.tip_height(),
        "history_len": ledger.history_len(),
        "stability_depth": ledger.stability_depth(),
        "max_history": ledger.config().max_history,
        "stable_snapshot_available": ledger.utxo_at_depth(ledger.stability_depth()).is_some(),
        "snapshots": snapshots,
    })
}

fn utxo_json(ledger: &TxStorage, depth: usize) -> Result<serde_json::Value> {
    let utxo = snapshot(ledger, depth)?;
    let outputs: Vec<serde_json::Value> = utxo
        .iter()
        .map(|(outpoint, output)| {
            json!({
                "outpoint": outpoint.to_string(),
                "owner": output.owner.to_string(),
                "value": output.value,
            })
        })
        .collect();

    Ok(json!({
        "depth": depth,
        "outputs": outputs,
    }))
}

fn balance_json(ledger: &TxStorage, args: &BalanceArgs) -> Result<serde_json::Value> {
    let owner = parse_owner(&args.owner)?;
    let utxo = snapshot(ledger, args.depth)?;

    Ok(json!({
        "owner": owner.to_string(),
        "depth": args.depth,
        "balance": utxo.balance_of(&owner),
    }))
}

fn snapshot(ledger: &TxStorage, depth: usize) -> Result<&Utxo> {
    match ledger.utxo_at_depth(depth) {
        Some(utxo) => Ok(utxo),
        None => bail!(
            "No snapshot at depth {depth}: history holds {}",
            ledger.history_len()
        ),
    }
}

fn parse_owner(s: &str) -> Result<Hash256> {
    let bytes = hex::decode(s.trim()).context("Owner must be hex-encoded")?;
    let array: [u8; 32] = match bytes.try_into() {
        Ok(array) => array,
        Err(bytes) => bail!("Owner must be exactly 32 bytes (got {})", bytes.len()),
    };
    Ok(Hash256::from_bytes(array))
}

/// Resolve history file path, using default if not provided.
fn resolve_history_path(path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = path {
        return Ok(p);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".txledger").join("history.bin"))
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txledger_core::types::{OutPoint, TxOutput};

    fn ledger() -> TxStorage {
        let genesis: Utxo = [
            (OutPoint::new(Hash256([0x01; 32]), 0), TxOutput { owner: Hash256([0xAA; 32]), value: 70 }),
            (OutPoint::new(Hash256([0x01; 32]), 1), TxOutput { owner: Hash256([0xBB; 32]), value: 30 }),
        ]
        .into_iter()
        .collect();
        TxStorage::with_default_verifier(genesis, LedgerConfig::with_stability_depth(2)).unwrap()
    }

    #[test]
    fn parse_owner_accepts_64_hex_chars() {
        let owner = parse_owner(&"ab".repeat(32)).unwrap();
        assert_eq!(owner, Hash256([0xAB; 32]));
    }

    #[test]
    fn parse_owner_rejects_bad_input() {
        assert!(parse_owner("zz").is_err());
        assert!(parse_owner(&"ab".repeat(31)).is_err());
    }

    #[test]
    fn info_reports_history() {
        let value = info_json(&ledger());
        assert_eq!(value["tip_height"], 0);
        assert_eq!(value["history_len"], 1);
        assert_eq!(value["stable_snapshot_available"], false);
        assert_eq!(value["snapshots"][0]["total_value"], 100);
    }

    #[test]
    fn utxo_lists_outputs() {
        let value = utxo_json(&ledger(), 0).unwrap();
        assert_eq!(value["outputs"].as_array().unwrap().len(), 2);
        assert!(utxo_json(&ledger(), 1).is_err());
    }

    #[test]
    fn balance_sums_owner_outputs() {
        let args = BalanceArgs { owner: "bb".repeat(32), depth: 0 };
        let value = balance_json(&ledger(), &args).unwrap();
        assert_eq!(value["balance"], 30);
    }

    #[test]
    fn loads_history_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.bin");
        ledger().persisted().write_to(&path).unwrap();

        let loaded = load_ledger(Some(path), None).unwrap();
        assert_eq!(loaded.current_utxo(), ledger().current_utxo());
    }
}
