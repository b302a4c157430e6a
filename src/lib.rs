//! # Fork-Consensus
//!
//! Block acceptance for a UTXO ledger that tracks competing branches.
//!
//! This crate decides whether an externally hashed and signed block may join
//! the block tree, keeps an independent UTXO set for every retained branch
//! node, and exposes the tip of the deepest branch together with its
//! spendable outputs and the pool of pending transactions.
//!
//! ## Architecture
//!
//! The system follows a layered architecture:
//! - UTXO set (spendable outputs of one branch)
//! - Transaction handler (single-transaction checks and batch selection)
//! - Block chain (fork tree, tip selection, staleness cutoff, pruning)
//! - Block handler (block assembly for a miner or network layer)
//!
//! ## Design Principles
//!
//! 1. **Private Snapshots**: validation runs on copies, so a rejected block
//!    leaves no trace
//! 2. **All or Nothing**: a block is accepted only if every transaction is
//! 3. **Bounded History**: nodes that can no longer be extended are discarded
//! 4. **No Panics on Bad Input**: invalid blocks and transactions are
//!    ordinary outcomes, not errors
//!
//! ## Usage
//!
//! ```rust
//! use fork_consensus::*;
//! use fork_consensus::transaction::create_coinbase_transaction;
//!
//! let mut genesis = Block {
//!     hash: [0; 32],
//!     prev_block_hash: None,
//!     coinbase: create_coinbase_transaction(BLOCK_REWARD, &vec![0x02; 33]),
//!     transactions: vec![],
//! };
//! genesis.finalize();
//!
//! let mut chain = BlockChain::new(genesis.clone());
//!
//! let mut next = Block {
//!     hash: [0; 32],
//!     prev_block_hash: Some(genesis.hash),
//!     coinbase: create_coinbase_transaction(BLOCK_REWARD, &vec![0x03; 33]),
//!     transactions: vec![],
//! };
//! next.finalize();
//!
//! assert!(chain.add_block(&next));
//! assert_eq!(chain.max_height(), 2);
//! assert_eq!(chain.max_height_utxo_pool().len(), 2);
//! ```

pub mod types;
pub mod constants;
pub mod config;
pub mod crypto;
pub mod utxo;
pub mod transaction;
pub mod tx_handler;
pub mod mempool;
pub mod blockchain;
pub mod mining;
pub mod error;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use config::{ChainConfig, ConflictFilter};
pub use crypto::{Secp256k1Verifier, SignatureVerifier};
pub use utxo::UtxoSet;
pub use tx_handler::TxHandler;
pub use mempool::TransactionPool;
pub use blockchain::{BlockChain, BlockNode, BlockRejection, NodeId, SharedBlockChain};
pub use mining::BlockHandler;
pub use error::{ConsensusError, Result};
