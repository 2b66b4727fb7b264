//! Ledger data model: transactions, blocks, UTXO snapshots.
//!
//! All values are plain owned data. A [`Utxo`] is never mutated after it has
//! been handed out by the storage; every transition builds a new value.

use std::collections::BTreeMap;
use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{TransactionError, VerifyError};

/// A 32-byte hash value.
///
/// Used for transaction identities and owner identities.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a Hash256 from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct OutPoint {
    /// Identity of the transaction that created the output.
    pub txid: Hash256,
    /// Index of the output within that transaction.
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, index: u32) -> Self {
        Self { txid, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// A transaction output: who owns it and how much.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub struct TxOutput {
    /// Identity of the owner allowed to spend the output.
    pub owner: Hash256,
    /// Amount in the smallest currency unit.
    pub value: u64,
}

/// A transaction moving value from spent outputs to new ones.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    /// Outputs consumed by this transaction, in order.
    pub inputs: Vec<OutPoint>,
    /// Outputs created by this transaction, in order.
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Compute the transaction identity (BLAKE3 of the canonical encoding).
    ///
    /// Uses bincode with standard config for deterministic serialization.
    pub fn txid(&self) -> Result<Hash256, TransactionError> {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        Ok(Hash256(blake3::hash(&encoded).into()))
    }

    /// Hash the transaction once and pair the identity with it.
    pub fn with_hash(self) -> Result<WithHash<Transaction>, TransactionError> {
        let hash = self.txid()?;
        Ok(WithHash { hash, value: self })
    }

    /// Sum of all output values. Returns None on overflow.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }
}

/// A value carried together with its precomputed hash.
///
/// The hash is computed once at construction and reused everywhere the
/// value's identity is needed. Serialized as the bare value; deserializing
/// recomputes the hash, so a stored hash can never disagree with the content.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WithHash<T> {
    hash: Hash256,
    value: T,
}

impl<T> WithHash<T> {
    /// The precomputed hash.
    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    /// The wrapped value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Unwrap, discarding the hash.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl WithHash<Transaction> {
    /// Output references created by this transaction, paired with their outputs.
    pub fn created_outputs(&self) -> impl Iterator<Item = (OutPoint, &TxOutput)> + '_ {
        self.value
            .outputs
            .iter()
            .enumerate()
            .map(|(index, out)| (OutPoint::new(self.hash, index as u32), out))
    }

    /// Output references consumed by this transaction.
    pub fn inputs(&self) -> &[OutPoint] {
        &self.value.inputs
    }
}

impl<T: Serialize> Serialize for WithHash<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WithHash<Transaction> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Transaction::deserialize(deserializer)?
            .with_hash()
            .map_err(de::Error::custom)
    }
}

impl<T> std::ops::Deref for WithHash<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Slot coordinates of a main block.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct SlotId {
    pub epoch: u64,
    pub slot: u32,
}

impl SlotId {
    pub fn new(epoch: u64, slot: u32) -> Self {
        Self { epoch, slot }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.epoch, self.slot)
    }
}

/// A block of the chain.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// Epoch-boundary marker. Carries no transactions but still occupies a
    /// height, so it still gets a history snapshot.
    Boundary { epoch: u64 },
    /// A block carrying transactions for one slot.
    Main {
        slot: SlotId,
        transactions: Vec<WithHash<Transaction>>,
    },
}

impl Block {
    /// Build a main block, hashing each transaction once.
    pub fn main(slot: SlotId, txs: Vec<Transaction>) -> Result<Self, TransactionError> {
        let transactions = txs
            .into_iter()
            .map(Transaction::with_hash)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Main { slot, transactions })
    }

    /// Epoch the block belongs to.
    pub fn epoch(&self) -> u64 {
        match self {
            Self::Boundary { epoch } => *epoch,
            Self::Main { slot, .. } => slot.epoch,
        }
    }

    /// Slot of a main block; boundary markers sit at slot 0 of their epoch.
    pub fn slot(&self) -> SlotId {
        match self {
            Self::Boundary { epoch } => SlotId::new(*epoch, 0),
            Self::Main { slot, .. } => *slot,
        }
    }

    /// Transactions carried by the block (empty for boundary markers).
    pub fn transactions(&self) -> &[WithHash<Transaction>] {
        match self {
            Self::Boundary { .. } => &[],
            Self::Main { transactions, .. } => transactions,
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self, Self::Boundary { .. })
    }
}

/// A candidate chain of blocks proposed to follow the rollback point.
///
/// Never empty. Blocks are ordered oldest first.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(try_from = "Vec<Block>")]
pub struct AltChain(Vec<Block>);

impl TryFrom<Vec<Block>> for AltChain {
    type Error = VerifyError;

    fn try_from(blocks: Vec<Block>) -> Result<Self, Self::Error> {
        Self::new(blocks)
    }
}

impl AltChain {
    /// Wrap a non-empty block sequence.
    pub fn new(blocks: Vec<Block>) -> Result<Self, VerifyError> {
        if blocks.is_empty() {
            return Err(VerifyError::EmptyChain);
        }
        Ok(Self(blocks))
    }

    /// A chain of exactly one block.
    pub fn single(block: Block) -> Self {
        Self(vec![block])
    }

    pub fn blocks(&self) -> &[Block] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for the `len`/`is_empty` pair.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.0.iter()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.0
    }
}

impl<'a> IntoIterator for &'a AltChain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Accepted transactions of each block of a chain, oldest block first.
pub type PerBlockTxs = Vec<Vec<WithHash<Transaction>>>;

/// An unspent-output snapshot: output reference → output.
///
/// Ordered so that equality, iteration and encoding are deterministic.
#[derive(
    Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Utxo(BTreeMap<OutPoint, TxOutput>);

impl Utxo {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TxOutput> {
        self.0.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.0.contains_key(outpoint)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TxOutput)> {
        self.0.iter()
    }

    /// Apply an already-verified transaction: remove its inputs, add its outputs.
    ///
    /// Does not check anything. Callers must have run the transaction
    /// through a [`TxVerifier`](crate::traits::TxVerifier) against this
    /// snapshot (or one it was derived from) first.
    pub fn apply_tx(&mut self, tx: &WithHash<Transaction>) {
        for input in tx.inputs() {
            self.0.remove(input);
        }
        for (outpoint, output) in tx.created_outputs() {
            self.0.insert(outpoint, output.clone());
        }
    }

    /// Apply a sequence of already-verified transactions in order.
    pub fn apply_all<'a>(&mut self, txs: impl IntoIterator<Item = &'a WithHash<Transaction>>) {
        for tx in txs {
            self.apply_tx(tx);
        }
    }

    /// Sum of all output values. Returns None on overflow.
    pub fn total_value(&self) -> Option<u64> {
        self.0
            .values()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }

    /// Sum of output values owned by `owner`, saturating.
    pub fn balance_of(&self, owner: &Hash256) -> u64 {
        self.0
            .values()
            .filter(|out| &out.owner == owner)
            .fold(0u64, |acc, out| acc.saturating_add(out.value))
    }
}

impl FromIterator<(OutPoint, TxOutput)> for Utxo {
    fn from_iter<I: IntoIterator<Item = (OutPoint, TxOutput)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
