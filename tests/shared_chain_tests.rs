//! Concurrent access through `SharedBlockChain`

use fork_consensus::transaction::create_coinbase_transaction;
use fork_consensus::*;
use std::thread;

fn block_on(prev: Option<Hash>, miner: u8) -> Block {
    let mut block = Block {
        hash: [0; 32],
        prev_block_hash: prev,
        coinbase: create_coinbase_transaction(BLOCK_REWARD, &vec![0x02, miner]),
        transactions: vec![],
    };
    block.finalize();
    block
}

#[test]
fn test_concurrent_siblings() {
    let _ = env_logger::builder().is_test(true).try_init();
    let genesis = block_on(None, 0);
    let shared = SharedBlockChain::new(BlockChain::new(genesis.clone()));

    let handles: Vec<_> = (1..=8u8)
        .map(|miner| {
            let shared = shared.clone();
            let parent = genesis.hash;
            thread::spawn(move || shared.add_block(&block_on(Some(parent), miner)))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }

    assert_eq!(shared.max_height(), 2);
    assert_eq!(shared.with_chain(|chain| chain.node_count()), 9);
    // every sibling requeued its coinbase
    assert_eq!(shared.transaction_pool().len(), 8);
}

#[test]
fn test_concurrent_readers_see_consistent_tip() {
    let genesis = block_on(None, 0);
    let shared = SharedBlockChain::new(BlockChain::new(genesis.clone()));

    let writer = {
        let shared = shared.clone();
        thread::spawn(move || {
            let mut prev = genesis.hash;
            for miner in 1..=30u8 {
                let block = block_on(Some(prev), miner);
                assert!(shared.add_block(&block));
                prev = block.hash;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let (tip_height, tip_outputs) = shared.with_chain(|chain| {
                        (chain.max_height(), chain.max_height_utxo_pool().len())
                    });
                    // one reward output per block on the branch
                    assert_eq!(tip_outputs as Natural, tip_height);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(shared.max_height(), 31);
    assert_eq!(shared.with_chain(|chain| chain.node_count()), (CUT_OFF_AGE + 1) as usize);
}
