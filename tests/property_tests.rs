//! Property-based tests for batch selection and the fork tree

use fork_consensus::transaction::create_coinbase_transaction;
use fork_consensus::*;
use proptest::prelude::*;
use std::collections::HashSet;

fn accept_all(_: &[u8], _: &[u8], _: &[u8]) -> bool {
    true
}

type Verify = fn(&[u8], &[u8], &[u8]) -> bool;

/// Outpoints (1..=4, 0..3) hold 20 each; hash 5 is never funded
fn initial_set() -> UtxoSet {
    let mut utxo_set = UtxoSet::new();
    for hash in 1..=4u8 {
        for index in 0..3 {
            utxo_set.add_utxo(
                OutPoint { hash: [hash; 32], index },
                TransactionOutput {
                    value: 20,
                    address: vec![0x02],
                },
            );
        }
    }
    utxo_set
}

fn total_value(utxo_set: &UtxoSet) -> i128 {
    utxo_set.iter().map(|(_, output)| output.value as i128).sum()
}

fn arb_tx() -> impl Strategy<Value = (Vec<(u8, Natural)>, Vec<Integer>)> {
    (
        prop::collection::vec((1u8..=5, 0u64..3), 0..4),
        prop::collection::vec(-5i64..60, 1..3),
    )
}

fn build_batch(specs: Vec<(Vec<(u8, Natural)>, Vec<Integer>)>) -> Vec<Transaction> {
    specs
        .into_iter()
        .enumerate()
        .map(|(i, (inputs, values))| Transaction {
            hash: [100 + i as u8; 32],
            inputs: inputs
                .into_iter()
                .map(|(hash, index)| TransactionInput {
                    prevout: OutPoint { hash: [hash; 32], index },
                    signature: vec![],
                })
                .collect(),
            outputs: values
                .into_iter()
                .map(|value| TransactionOutput {
                    value,
                    address: vec![0x03],
                })
                .collect(),
        })
        .collect()
}

fn block_on(prev: Hash, miner: u16) -> Block {
    let mut block = Block {
        hash: [0; 32],
        prev_block_hash: Some(prev),
        coinbase: create_coinbase_transaction(BLOCK_REWARD, &miner.to_be_bytes().to_vec()),
        transactions: vec![],
    };
    block.finalize();
    block
}

proptest! {
    #[test]
    fn prop_handle_txs_never_creates_value(
        specs in prop::collection::vec(arb_tx(), 0..8),
        outpoint_filter in any::<bool>(),
    ) {
        let initial = initial_set();
        let batch = build_batch(specs);
        let filter = if outpoint_filter { ConflictFilter::OutPoint } else { ConflictFilter::PrevTxHash };
        let mut handler = TxHandler::with_conflict_filter(&initial, &accept_all, filter);

        let accepted = handler.handle_txs(&batch);

        prop_assert!(accepted.len() <= batch.len());
        prop_assert!(total_value(handler.utxo_set()) <= total_value(&initial));

        let mut spent = HashSet::new();
        for tx in &accepted {
            prop_assert!(tx.outputs.iter().all(|o| o.value >= 0));
            for input in &tx.inputs {
                prop_assert!(spent.insert(input.prevout), "outpoint spent twice");
                prop_assert!(!handler.utxo_set().contains(&input.prevout));
            }
        }
    }

    #[test]
    fn prop_accepted_subset_is_self_consistent(specs in prop::collection::vec(arb_tx(), 0..8)) {
        let initial = initial_set();
        let batch = build_batch(specs);
        let mut handler = TxHandler::new(&initial, &accept_all);
        let accepted = handler.handle_txs(&batch);

        // replaying the accepted transactions alone selects all of them
        let mut replay = TxHandler::new(&initial, &accept_all);
        prop_assert_eq!(replay.handle_txs(&accepted), accepted);
        prop_assert_eq!(replay.utxo_set(), handler.utxo_set());
    }

    #[test]
    fn prop_tree_respects_cutoff(parents in prop::collection::vec(any::<prop::sample::Index>(), 1..40)) {
        let mut genesis = Block {
            hash: [0; 32],
            prev_block_hash: None,
            coinbase: create_coinbase_transaction(BLOCK_REWARD, &vec![0xff]),
            transactions: vec![],
        };
        genesis.finalize();
        let mut chain = BlockChain::with_verifier(genesis.clone(), accept_all as Verify);
        let mut known = vec![genesis.hash];

        for (miner, pick) in parents.iter().enumerate() {
            let parent = *pick.get(&known);
            let block = block_on(parent, miner as u16);
            let max_before = chain.max_height();

            let accepted = chain.add_block(&block);
            match chain.height_of(&parent) {
                Some(parent_height) if parent_height + 1 > max_before.saturating_sub(CUT_OFF_AGE) => {
                    prop_assert!(accepted);
                }
                Some(_) => prop_assert!(!accepted),
                None => prop_assert!(!accepted),
            }
            if accepted {
                known.push(block.hash);
            }

            let max = chain.max_height();
            prop_assert_eq!(chain.height_of(&chain.max_height_block().hash), Some(max));
            for hash in &known {
                if let Some(height) = chain.height_of(hash) {
                    prop_assert!(height + CUT_OFF_AGE >= max);
                }
            }
        }
    }
}
