//! UTXO set: the spendable outputs reachable on one branch

use crate::types::*;
use std::collections::HashMap;

/// UTXO Set: OutPoint → TransactionOutput
///
/// `Clone` is the independent copy: outputs are immutable values, so cloning
/// the map never lets a mutation of the copy reach the original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    utxos: HashMap<OutPoint, TransactionOutput>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TransactionOutput> {
        self.utxos.get(outpoint)
    }

    /// Add (or replace) the output stored under `outpoint`
    pub fn add_utxo(&mut self, outpoint: OutPoint, output: TransactionOutput) {
        self.utxos.insert(outpoint, output);
    }

    /// Remove a spent output; returns it if it was present
    pub fn remove_utxo(&mut self, outpoint: &OutPoint) -> Option<TransactionOutput> {
        self.utxos.remove(outpoint)
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// All outpoints currently unspent, in no particular order
    pub fn all_utxos(&self) -> Vec<OutPoint> {
        self.utxos.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TransactionOutput)> {
        self.utxos.iter()
    }

    /// Sum of the values spendable by `address`
    pub fn balance(&self, address: &[u8]) -> i128 {
        self.utxos
            .values()
            .filter(|output| output.address == address)
            .map(|output| output.value as i128)
            .sum()
    }
}
