//! Transaction encoding, digests and signing payloads
//!
//! The validation core only reads the digests carried by blocks and
//! transactions. These helpers let a harness produce those digests and the
//! per-input signing payload the validation engine verifies against.

use crate::constants::BLOCK_REWARD;
use crate::crypto::{sha256_hash, sign_message};
use crate::error::{ConsensusError, Result};
use crate::types::*;

/// Coinbase: zero inputs, exactly one output
pub fn is_coinbase(tx: &Transaction) -> bool {
    tx.inputs.is_empty() && tx.outputs.len() == 1
}

/// RawDataToSign: 𝒯𝒳 × ℕ → 𝕊
///
/// For input i of tx the signed message is:
/// 1. i.prevout.hash
/// 2. i.prevout.index as 4 big-endian bytes
/// 3. for every output o: o.value as 8 big-endian bytes ‖ o.address
///
/// The signature field of the input is not part of the message. Returns `None`
/// when `input_index` is out of range.
pub fn raw_data_to_sign(tx: &Transaction, input_index: usize) -> Option<ByteString> {
    let input = tx.inputs.get(input_index)?;

    let mut data = Vec::with_capacity(36 + tx.outputs.len() * 41);
    data.extend_from_slice(&input.prevout.hash);
    data.extend_from_slice(&(input.prevout.index as u32).to_be_bytes());

    for output in &tx.outputs {
        data.extend_from_slice(&output.value.to_be_bytes());
        data.extend_from_slice(&output.address);
    }

    Some(data)
}

/// Full transaction encoding, signatures included
pub fn raw_tx(tx: &Transaction) -> ByteString {
    let mut data = Vec::new();

    for input in &tx.inputs {
        data.extend_from_slice(&input.prevout.hash);
        data.extend_from_slice(&(input.prevout.index as u32).to_be_bytes());
        data.extend_from_slice(&input.signature);
    }

    for output in &tx.outputs {
        data.extend_from_slice(&output.value.to_be_bytes());
        data.extend_from_slice(&output.address);
    }

    data
}

/// Transaction digest: SHA256 of the raw encoding
pub fn calculate_tx_id(tx: &Transaction) -> Hash {
    sha256_hash(&raw_tx(tx))
}

/// Block digest: SHA256 of parent digest ‖ coinbase ‖ transactions
pub fn calculate_block_hash(block: &Block) -> Hash {
    let mut data = Vec::new();

    if let Some(prev) = &block.prev_block_hash {
        data.extend_from_slice(prev);
    }

    data.extend_from_slice(&raw_tx(&block.coinbase));
    for tx in &block.transactions {
        data.extend_from_slice(&raw_tx(tx));
    }

    sha256_hash(&data)
}

/// Create coinbase transaction paying `value` to `address`
///
/// Two coinbases with the same value and address share a digest.
pub fn create_coinbase_transaction(value: Integer, address: &ByteString) -> Transaction {
    let mut tx = Transaction {
        hash: [0; 32],
        inputs: vec![],
        outputs: vec![TransactionOutput {
            value,
            address: address.clone(),
        }],
    };
    tx.finalize();
    tx
}

/// Coinbase carrying the standard block reward
pub fn create_reward_transaction(address: &ByteString) -> Transaction {
    create_coinbase_transaction(BLOCK_REWARD, address)
}

/// Sign input `input_index` of `tx` with `secret_key`
///
/// The transaction digest is not refreshed; call `Transaction::finalize`
/// once every input is signed.
pub fn sign_input(tx: &mut Transaction, input_index: usize, secret_key: &[u8]) -> Result<()> {
    let message = raw_data_to_sign(tx, input_index).ok_or_else(|| {
        ConsensusError::TransactionValidation(format!(
            "Input index {} out of range ({} inputs)",
            input_index,
            tx.inputs.len()
        ))
    })?;

    tx.inputs[input_index].signature = sign_message(secret_key, &message)?;
    Ok(())
}
