//! Block assembly on top of the current tip
//!
//! `BlockHandler` is the surface a miner or network layer drives: it forwards
//! received blocks and transactions to the fork tree and assembles new blocks
//! from the pending pool. Proof-of-work is not performed here.

use crate::blockchain::BlockChain;
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use crate::transaction::create_reward_transaction;
use crate::tx_handler::TxHandler;
use crate::types::*;
use log::debug;

pub struct BlockHandler<V = Secp256k1Verifier> {
    chain: BlockChain<V>,
}

impl<V: SignatureVerifier> BlockHandler<V> {
    pub fn new(chain: BlockChain<V>) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &BlockChain<V> {
        &self.chain
    }

    pub fn into_chain(self) -> BlockChain<V> {
        self.chain
    }

    /// Add a received block; an absent block is rejected
    pub fn process_block(&mut self, block: Option<&Block>) -> bool {
        match block {
            Some(block) => self.chain.add_block(block),
            None => false,
        }
    }

    /// Add a received transaction to the pending pool
    pub fn process_tx(&mut self, tx: Transaction) {
        self.chain.add_transaction(tx);
    }

    /// CreateNewBlock: 𝒰𝒮 × 𝒯𝒳* → ℬ
    ///
    /// 1. Create coinbase paying the block reward to `address`
    /// 2. Select pool transactions with `handle_txs` against the tip's UTXO set,
    ///    visiting the pool in digest order
    /// 3. Link to the tip, compute the block digest and add the block
    ///
    /// Returns the block if the chain accepted it.
    pub fn create_block(&mut self, address: &ByteString) -> Option<Block> {
        let parent_hash = self.chain.max_height_block().hash;
        let coinbase = create_reward_transaction(address);

        let mut candidates = self.chain.transaction_pool().transactions();
        candidates.sort_by(|a, b| a.hash.cmp(&b.hash));

        let mut handler = TxHandler::with_conflict_filter(
            self.chain.max_height_utxo_pool(),
            self.chain.verifier(),
            self.chain.config().conflict_filter,
        );
        let transactions = handler.handle_txs(&candidates);

        let mut block = Block {
            hash: [0; 32],
            prev_block_hash: Some(parent_hash),
            coinbase,
            transactions,
        };
        block.finalize();

        debug!(
            "Assembled block {} with {} of {} pooled transaction(s)",
            short_hash(&block.hash),
            block.transactions.len(),
            candidates.len()
        );

        if self.chain.add_block(&block) {
            Some(block)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BLOCK_REWARD;
    use crate::transaction::create_coinbase_transaction;

    type Verify = fn(&[u8], &[u8], &[u8]) -> bool;

    fn accept_all(_: &[u8], _: &[u8], _: &[u8]) -> bool {
        true
    }

    fn handler() -> (BlockHandler<Verify>, Block) {
        let mut genesis = Block {
            hash: [0; 32],
            prev_block_hash: None,
            coinbase: create_coinbase_transaction(BLOCK_REWARD, &vec![0]),
            transactions: vec![],
        };
        genesis.finalize();
        let chain = BlockChain::with_verifier(genesis.clone(), accept_all as Verify);
        (BlockHandler::new(chain), genesis)
    }

    fn spend(prevout: OutPoint, value: Integer, to: u8) -> Transaction {
        let mut tx = Transaction {
            hash: [0; 32],
            inputs: vec![TransactionInput {
                prevout,
                signature: vec![],
            }],
            outputs: vec![TransactionOutput {
                value,
                address: vec![to],
            }],
        };
        tx.finalize();
        tx
    }

    #[test]
    fn test_process_absent_block() {
        let (mut handler, _) = handler();
        assert!(!handler.process_block(None));
    }

    #[test]
    fn test_create_empty_block() {
        let (mut handler, genesis) = handler();

        let block = handler.create_block(&vec![1]).unwrap();
        assert_eq!(block.prev_block_hash, Some(genesis.hash));
        assert!(block.transactions.is_empty());
        assert_eq!(handler.chain().max_height(), 2);
        assert_eq!(handler.chain().max_height_block().hash, block.hash);
    }

    #[test]
    fn test_create_block_includes_valid_pool_transactions() {
        let (mut handler, genesis) = handler();
        let valid = spend(genesis.coinbase.outpoint(0), 20, 7);
        let invalid = spend(OutPoint { hash: [0xee; 32], index: 0 }, 1, 7);
        handler.process_tx(valid.clone());
        handler.process_tx(invalid.clone());

        let block = handler.create_block(&vec![1]).unwrap();
        assert_eq!(block.transactions, vec![valid.clone()]);

        let pool = handler.chain().transaction_pool();
        assert!(!pool.contains(&valid.hash));
        assert!(pool.contains(&invalid.hash));
        assert!(pool.contains(&block.coinbase.hash));
    }

    #[test]
    fn test_requeued_coinbase_is_never_mined() {
        let (mut handler, _) = handler();
        let first = handler.create_block(&vec![1]).unwrap();
        let second = handler.create_block(&vec![2]).unwrap();

        assert!(second.transactions.is_empty());
        assert!(handler.chain().transaction_pool().contains(&first.coinbase.hash));
    }

    #[test]
    fn test_process_block_from_peer() {
        let (mut handler, genesis) = handler();
        let mut block = Block {
            hash: [0; 32],
            prev_block_hash: Some(genesis.hash),
            coinbase: create_coinbase_transaction(BLOCK_REWARD, &vec![5]),
            transactions: vec![],
        };
        block.finalize();

        assert!(handler.process_block(Some(&block)));
        assert!(!handler.process_block(Some(&block)));
        assert_eq!(handler.into_chain().max_height(), 2);
    }
}
