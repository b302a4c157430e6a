//! Fork tree: competing branches, the canonical tip and bounded history
//!
//! Every accepted block becomes a node holding its own UTXO set: the genesis
//! set with every transaction from genesis to that block applied. Nodes live
//! in a flat arena addressed by `NodeId`; a digest index maps block hashes to
//! arena slots. After each acceptance the arena is compacted so that only
//! nodes that can still serve as a parent remain.

use crate::config::ChainConfig;
use crate::constants::*;
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use crate::mempool::TransactionPool;
use crate::tx_handler::TxHandler;
use crate::types::*;
use crate::utxo::UtxoSet;
use log::{debug, info, trace};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Arena slot of a node; stable until the next pruning sweep
pub type NodeId = usize;

/// One accepted block and the ledger state after it
#[derive(Debug, Clone)]
pub struct BlockNode {
    block: Block,
    height: Natural,
    parent: Option<NodeId>,
    utxo_set: UtxoSet,
}

impl BlockNode {
    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn height(&self) -> Natural {
        self.height
    }

    /// Parent slot, `None` for genesis and for nodes whose parent was pruned
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }
}

/// Why `add_block` refused a block
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockRejection {
    #[error("block is already registered")]
    DuplicateBlock,

    #[error("block has no parent digest")]
    MissingParent,

    #[error("parent block is unknown or no longer retained")]
    UnknownParent,

    #[error("height {height} is too far below the tip at height {max_height}")]
    StaleBranch { height: Natural, max_height: Natural },

    #[error("only {accepted} of {submitted} transactions are valid")]
    InvalidTransactions { accepted: usize, submitted: usize },
}

pub struct BlockChain<V = Secp256k1Verifier> {
    nodes: Vec<BlockNode>,
    index: HashMap<Hash, NodeId>,
    genesis_hash: Hash,
    tip: NodeId,
    tx_pool: TransactionPool,
    verifier: V,
    config: ChainConfig,
}

impl BlockChain<Secp256k1Verifier> {
    /// Create a chain holding only `genesis`, verifying signatures with secp256k1
    pub fn new(genesis: Block) -> Self {
        Self::with_verifier(genesis, Secp256k1Verifier::new())
    }
}

impl<V: SignatureVerifier> BlockChain<V> {
    pub fn with_verifier(genesis: Block, verifier: V) -> Self {
        Self::with_config(genesis, verifier, ChainConfig::default())
    }

    /// Create a chain holding only `genesis`
    ///
    /// The genesis block is trusted: its UTXO set holds the genesis coinbase
    /// output and nothing else.
    pub fn with_config(genesis: Block, verifier: V, config: ChainConfig) -> Self {
        let mut utxo_set = UtxoSet::new();
        add_coinbase_output(&mut utxo_set, &genesis.coinbase);

        let genesis_hash = genesis.hash;
        let root = BlockNode {
            block: genesis,
            height: GENESIS_HEIGHT,
            parent: None,
            utxo_set,
        };

        let mut index = HashMap::new();
        index.insert(genesis_hash, 0);

        Self {
            nodes: vec![root],
            index,
            genesis_hash,
            tip: 0,
            tx_pool: TransactionPool::new(),
            verifier,
            config,
        }
    }

    /// Block at the tip of the deepest branch
    pub fn max_height_block(&self) -> &Block {
        &self.tip_node().block
    }

    /// UTXO set to mine on top of the tip
    pub fn max_height_utxo_pool(&self) -> &UtxoSet {
        &self.tip_node().utxo_set
    }

    /// Independent copy of the pending-transaction pool
    pub fn transaction_pool(&self) -> TransactionPool {
        self.tx_pool.clone()
    }

    /// Add a transaction to the pending pool without validating it
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.tx_pool.add_transaction(tx);
    }

    pub fn max_height(&self) -> Natural {
        self.tip_node().height
    }

    pub fn genesis_hash(&self) -> &Hash {
        &self.genesis_hash
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn contains_block(&self, hash: &Hash) -> bool {
        self.index.contains_key(hash)
    }

    pub fn get_node(&self, hash: &Hash) -> Option<&BlockNode> {
        self.index.get(hash).map(|&id| &self.nodes[id])
    }

    pub fn get_block(&self, hash: &Hash) -> Option<&Block> {
        self.get_node(hash).map(BlockNode::block)
    }

    pub fn height_of(&self, hash: &Hash) -> Option<Natural> {
        self.get_node(hash).map(BlockNode::height)
    }

    pub fn utxo_pool_at(&self, hash: &Hash) -> Option<&UtxoSet> {
        self.get_node(hash).map(BlockNode::utxo_set)
    }

    /// Number of retained nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The node for `hash` followed by its retained ancestors, newest first
    pub fn branch(&self, hash: &Hash) -> impl Iterator<Item = &BlockNode> + '_ {
        let start = self.index.get(hash).copied();
        std::iter::successors(start, move |&id| self.nodes[id].parent).map(move |id| &self.nodes[id])
    }

    /// Add `block` if it is valid; returns whether it was accepted
    pub fn add_block(&mut self, block: &Block) -> bool {
        match self.add_block_with_reason(block) {
            Ok(_) => true,
            Err(reason) => {
                debug!("Rejected block {}: {}", short_hash(&block.hash), reason);
                false
            }
        }
    }

    /// AddBlock: ℬ → NodeId | rejection
    ///
    /// 1. The digest must be new and the parent must be a retained node
    /// 2. height = parent.height + 1 must exceed max_height - CUT_OFF_AGE
    /// 3. Every transaction must survive `TxHandler::handle_txs` run over a
    ///    copy of the parent's UTXO set; otherwise nothing changes
    /// 4. The coinbase output is added unconditionally and the node registered;
    ///    the tip moves only to a strictly higher node
    /// 5. Confirmed transactions leave the pending pool, the coinbase enters it
    /// 6. Nodes that can no longer be extended are pruned
    pub fn add_block_with_reason(&mut self, block: &Block) -> Result<NodeId, BlockRejection> {
        if self.index.contains_key(&block.hash) {
            return Err(BlockRejection::DuplicateBlock);
        }

        let parent_hash = block.prev_block_hash.ok_or(BlockRejection::MissingParent)?;
        let parent_id = *self
            .index
            .get(&parent_hash)
            .ok_or(BlockRejection::UnknownParent)?;

        let parent = &self.nodes[parent_id];
        let height = parent.height + 1;
        let max_height = self.max_height();
        if height <= max_height.saturating_sub(CUT_OFF_AGE) {
            return Err(BlockRejection::StaleBranch { height, max_height });
        }

        let mut handler = TxHandler::with_conflict_filter(
            &parent.utxo_set,
            &self.verifier,
            self.config.conflict_filter,
        );
        let accepted = handler.handle_txs(&block.transactions);
        if accepted.len() != block.transactions.len() {
            return Err(BlockRejection::InvalidTransactions {
                accepted: accepted.len(),
                submitted: block.transactions.len(),
            });
        }

        let mut utxo_set = handler.into_utxo_set();
        add_coinbase_output(&mut utxo_set, &block.coinbase);

        let id = self.nodes.len();
        self.nodes.push(BlockNode {
            block: block.clone(),
            height,
            parent: Some(parent_id),
            utxo_set,
        });
        self.index.insert(block.hash, id);

        let new_tip = height > max_height;
        if new_tip {
            self.tip = id;
        }

        for tx in &block.transactions {
            self.tx_pool.remove_transaction(&tx.hash);
        }
        if self.config.requeue_coinbase {
            self.tx_pool.add_transaction(block.coinbase.clone());
        }

        info!(
            "Accepted block {} at height {} with {} transaction(s){}",
            short_hash(&block.hash),
            height,
            block.transactions.len(),
            if new_tip { ", new tip" } else { "" }
        );

        self.prune();
        Ok(self.index.get(&block.hash).copied().unwrap_or(id))
    }

    fn tip_node(&self) -> &BlockNode {
        &self.nodes[self.tip]
    }

    /// Drop every node at height ≤ max_height - CUT_OFF_AGE - 1 and compact
    /// the arena. Such a node's children would land at or below the staleness
    /// cutoff, so it can never be a parent again.
    fn prune(&mut self) {
        let cutoff = match self.max_height().checked_sub(CUT_OFF_AGE + 1) {
            Some(cutoff) => cutoff,
            None => return,
        };
        if self.nodes.iter().all(|node| node.height > cutoff) {
            return;
        }

        let mut remap: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        let old_nodes = std::mem::take(&mut self.nodes);
        let before = old_nodes.len();

        for (old_id, node) in old_nodes.into_iter().enumerate() {
            if node.height > cutoff {
                remap[old_id] = Some(self.nodes.len());
                self.nodes.push(node);
            }
        }

        for node in &mut self.nodes {
            node.parent = node.parent.and_then(|parent| remap[parent]);
        }
        if let Some(tip) = remap[self.tip] {
            self.tip = tip;
        }
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(id, node)| (node.block.hash, id))
            .collect();

        trace!(
            "Pruned {} node(s) at or below height {}",
            before - self.nodes.len(),
            cutoff
        );
    }
}

/// Add the coinbase's single output to `utxo_set`
fn add_coinbase_output(utxo_set: &mut UtxoSet, coinbase: &Transaction) {
    if let Some(output) = coinbase.outputs.first() {
        utxo_set.add_utxo(coinbase.outpoint(COINBASE_OUTPUT_INDEX), output.clone());
    }
}

/// A `BlockChain` behind one mutex
///
/// Every operation takes the lock for its whole duration, so concurrent
/// `add_block` calls behave as some sequential order. Queries return owned
/// snapshots.
pub struct SharedBlockChain<V = Secp256k1Verifier> {
    inner: Arc<Mutex<BlockChain<V>>>,
}

impl<V> Clone for SharedBlockChain<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: SignatureVerifier> SharedBlockChain<V> {
    pub fn new(chain: BlockChain<V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chain)),
        }
    }

    /// A panic while holding the lock cannot leave the chain half-updated:
    /// validation runs on private copies before any shared state is written.
    fn lock(&self) -> MutexGuard<'_, BlockChain<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_block(&self, block: &Block) -> bool {
        self.lock().add_block(block)
    }

    pub fn add_transaction(&self, tx: Transaction) {
        self.lock().add_transaction(tx);
    }

    pub fn max_height_block(&self) -> Block {
        self.lock().max_height_block().clone()
    }

    pub fn max_height_utxo_pool(&self) -> UtxoSet {
        self.lock().max_height_utxo_pool().clone()
    }

    pub fn transaction_pool(&self) -> TransactionPool {
        self.lock().transaction_pool()
    }

    pub fn max_height(&self) -> Natural {
        self.lock().max_height()
    }

    /// Run `f` against the chain while holding the lock
    pub fn with_chain<R>(&self, f: impl FnOnce(&BlockChain<V>) -> R) -> R {
        f(&self.lock())
    }
}
