//! Core ledger types for fork-aware block validation

use serde::{Deserialize, Serialize};

/// Hash type: 256-bit digest, supplied by the caller for blocks and transactions
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Natural number type
pub type Natural = u64;

/// Integer type (signed so that negative output values can be represented and rejected)
pub type Integer = i64;

/// OutPoint: (producing transaction digest, output index)
///
/// Uniquely identifies one unspent output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: Natural,
}

/// Transaction Input: a claimed outpoint plus the proof authorizing the spend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub signature: ByteString,
}

/// Transaction Output: value paid to the holder of `address`
///
/// `address` is the SEC1-encoded public key of the authorized spender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Integer,
    pub address: ByteString,
}

/// Transaction: digest, ordered inputs, ordered outputs
///
/// The digest is computed upstream and trusted as collision resistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: Hash,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    /// Recompute `hash` from the transaction contents
    pub fn finalize(&mut self) {
        self.hash = crate::transaction::calculate_tx_id(self);
    }

    /// Outpoint of the output at `index`
    pub fn outpoint(&self, index: Natural) -> OutPoint {
        OutPoint {
            hash: self.hash,
            index,
        }
    }
}

/// Block: parent link, digest, reward transaction and ordinary transactions
///
/// `transactions` never contains the coinbase; it is carried separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: Hash,
    pub prev_block_hash: Option<Hash>,
    pub coinbase: Transaction,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Recompute `hash` from the parent link and the transactions
    pub fn finalize(&mut self) {
        self.hash = crate::transaction::calculate_block_hash(self);
    }
}

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// First four bytes of a digest as hex, for log lines
pub(crate) fn short_hash(hash: &Hash) -> String {
    hash[..4].iter().map(|b| format!("{:02x}", b)).collect()
}
