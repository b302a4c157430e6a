//! Transaction validation engine
//!
//! A `TxHandler` owns a private copy of a UTXO set. It checks single
//! transactions against that set and, given a batch, selects the transactions
//! that can be applied one after another, mutating its set as it goes. The
//! caller's set is never touched.

use crate::config::ConflictFilter;
use crate::crypto::SignatureVerifier;
use crate::transaction::raw_data_to_sign;
use crate::types::*;
use crate::utxo::UtxoSet;
use log::{debug, trace};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Key under which the batch pre-filter records a claimed input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ConflictKey {
    PrevTx(Hash),
    OutPoint(OutPoint),
}

pub struct TxHandler<'v, V: SignatureVerifier + ?Sized> {
    utxo_set: UtxoSet,
    verifier: &'v V,
    conflict_filter: ConflictFilter,
}

impl<'v, V: SignatureVerifier + ?Sized> TxHandler<'v, V> {
    /// Create a handler over an independent copy of `utxo_set`
    pub fn new(utxo_set: &UtxoSet, verifier: &'v V) -> Self {
        Self::with_conflict_filter(utxo_set, verifier, ConflictFilter::default())
    }

    pub fn with_conflict_filter(
        utxo_set: &UtxoSet,
        verifier: &'v V,
        conflict_filter: ConflictFilter,
    ) -> Self {
        Self {
            utxo_set: utxo_set.clone(),
            verifier,
            conflict_filter,
        }
    }

    /// Current UTXO set, reflecting every transaction accepted so far
    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    pub fn into_utxo_set(self) -> UtxoSet {
        self.utxo_set
    }

    /// CheckTx: 𝒯𝒳 × 𝒰𝒮 → {valid, invalid}
    ///
    /// A transaction tx is valid against the current set us iff:
    /// 1. ∀i ∈ ins: i.prevout ∈ us
    /// 2. no outpoint is claimed twice by tx
    /// 3. ∀i ∈ ins: verify(us(i.prevout).address, RawDataToSign(tx, i), i.signature)
    /// 4. ∀o ∈ outs: o.value ≥ 0
    /// 5. Σᵢ us(i.prevout).value ≥ Σₒ o.value
    ///
    /// Every rule applies to every transaction handed to the engine. The block
    /// coinbase is exempt because it is carried outside `Block::transactions`
    /// and never reaches this check.
    pub fn check_tx(&self, tx: &Transaction) -> ValidationResult {
        let mut claimed = HashSet::with_capacity(tx.inputs.len());
        let mut total_input_value: i128 = 0;

        for (i, input) in tx.inputs.iter().enumerate() {
            let utxo = match self.utxo_set.get(&input.prevout) {
                Some(utxo) => utxo,
                None => {
                    return ValidationResult::Invalid(format!(
                        "Input {} not found in UTXO set",
                        i
                    ))
                }
            };

            if !claimed.insert(input.prevout) {
                return ValidationResult::Invalid(format!(
                    "Input {} claims an outpoint already claimed by this transaction",
                    i
                ));
            }

            let message = match raw_data_to_sign(tx, i) {
                Some(message) => message,
                None => return ValidationResult::Invalid(format!("No signing payload for input {}", i)),
            };
            if !self.verifier.verify(&utxo.address, &message, &input.signature) {
                return ValidationResult::Invalid(format!("Invalid signature at input {}", i));
            }

            total_input_value += utxo.value as i128;
        }

        for (i, output) in tx.outputs.iter().enumerate() {
            if output.value < 0 {
                return ValidationResult::Invalid(format!(
                    "Negative output value {} at index {}",
                    output.value, i
                ));
            }
        }

        let total_output_value: i128 = tx.outputs.iter().map(|o| o.value as i128).sum();
        if total_output_value > total_input_value {
            return ValidationResult::Invalid(format!(
                "Insufficient input value: {} in, {} out",
                total_input_value, total_output_value
            ));
        }

        ValidationResult::Valid
    }

    pub fn is_valid_tx(&self, tx: &Transaction) -> bool {
        self.check_tx(tx).is_valid()
    }

    /// HandleTxs: 𝒯𝒳* → 𝒯𝒳*
    ///
    /// 1. Drop batch-level conflicts (see `filter_conflicts`)
    /// 2. In the surviving order, accept each transaction valid against the
    ///    current set and apply it immediately; drop the rest for good
    /// 3. Return the accepted transactions in acceptance order
    ///
    /// A transaction may spend an output created by an earlier accepted
    /// transaction of the same batch.
    pub fn handle_txs(&mut self, possible_txs: &[Transaction]) -> Vec<Transaction> {
        let candidates = self.filter_conflicts(possible_txs);
        let mut accepted = Vec::with_capacity(candidates.len());

        for tx in candidates {
            match self.check_tx(tx) {
                ValidationResult::Valid => {
                    self.apply_tx(tx);
                    accepted.push(tx.clone());
                }
                ValidationResult::Invalid(reason) => {
                    debug!("Dropping transaction {}: {}", short_hash(&tx.hash), reason);
                }
            }
        }

        accepted
    }

    /// Iteratively remove transactions whose inputs collide with an earlier
    /// transaction of the batch until a pass removes nothing.
    ///
    /// Within a pass every input key is registered to the first transaction
    /// that used it, and keys registered by a transaction dropped in that same
    /// pass still count. Repeated keys inside one transaction are not a
    /// batch conflict; `check_tx` rejects them.
    fn filter_conflicts<'t>(&self, txs: &'t [Transaction]) -> Vec<&'t Transaction> {
        let mut surviving: Vec<&Transaction> = txs.iter().collect();

        loop {
            let mut claimed: HashMap<ConflictKey, usize> = HashMap::new();
            let mut dropped: HashSet<usize> = HashSet::new();

            for (i, tx) in surviving.iter().enumerate() {
                for input in &tx.inputs {
                    match claimed.entry(self.conflict_key(&input.prevout)) {
                        Entry::Vacant(entry) => {
                            entry.insert(i);
                        }
                        Entry::Occupied(entry) => {
                            if *entry.get() != i {
                                dropped.insert(i);
                            }
                        }
                    }
                }
            }

            if dropped.is_empty() {
                return surviving;
            }

            trace!("Conflict filter dropped {} transaction(s)", dropped.len());
            surviving = surviving
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !dropped.contains(i))
                .map(|(_, tx)| tx)
                .collect();
        }
    }

    fn conflict_key(&self, prevout: &OutPoint) -> ConflictKey {
        match self.conflict_filter {
            ConflictFilter::PrevTxHash => ConflictKey::PrevTx(prevout.hash),
            ConflictFilter::OutPoint => ConflictKey::OutPoint(*prevout),
        }
    }

    /// ApplyTransaction: us' = (us \ {i.prevout}) ∪ {(tx.hash, k) ↦ tx.outputs[k]}
    fn apply_tx(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            self.utxo_set.remove_utxo(&input.prevout);
        }

        for (k, output) in tx.outputs.iter().enumerate() {
            self.utxo_set.add_utxo(tx.outpoint(k as Natural), output.clone());
        }
    }
}
