//! Pending transaction pool
//!
//! Transactions known to the node but not yet confirmed on the canonical
//! branch. No validation happens on insertion; transactions are checked when
//! a block is assembled from the pool.

use crate::types::*;
use std::collections::HashMap;

/// Transaction pool keyed by transaction digest
///
/// `Clone` yields an independent pool: mutating the copy never affects the
/// original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPool {
    transactions: HashMap<Hash, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `tx`, replacing any transaction with the same digest
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.insert(tx.hash, tx);
    }

    pub fn remove_transaction(&mut self, hash: &Hash) -> Option<Transaction> {
        self.transactions.remove(hash)
    }

    pub fn get_transaction(&self, hash: &Hash) -> Option<&Transaction> {
        self.transactions.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.transactions.contains_key(hash)
    }

    /// Snapshot of every pooled transaction, in no particular order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
