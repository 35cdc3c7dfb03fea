//! End-to-end exercises of the shard lifecycle engine: chain growth,
//! distribution and rebalancing, authenticated cross-shard transfers with
//! rollback, and pruning with integrity proofs.

use ledgersim_core::{Blockchain, MerkleTree};
use ledgersim_state::{EnhancedSyncManager, ShardManager, StatePruner, FABRIC_TRANSFER_KEY};

const PAYLOADS: [&str; 8] = [
    "First Block after Genesis",
    "Second Block",
    "Third Block",
    "Fourth Block",
    "Fifth Block",
    "Sixth Block",
    "Seventh Block",
    "Eighth Block",
];

fn nine_block_chain() -> Blockchain {
    let mut chain = Blockchain::new();
    for payload in PAYLOADS {
        chain.add_block(payload);
    }
    chain
}

fn distributed_manager() -> ShardManager {
    let mut manager = ShardManager::new();
    for block in nine_block_chain().blocks {
        manager.distribute_block(block);
    }
    manager
}

#[test]
fn chain_of_nine_links_correctly() {
    let chain = nine_block_chain();

    assert_eq!(chain.len(), 9);
    assert_eq!(chain.blocks[0].index, 0);
    assert_eq!(chain.blocks[8].index, 8);
    for i in 1..9 {
        assert_eq!(chain.blocks[i].prev_hash, chain.blocks[i - 1].hash);
    }
    assert!(chain.validate().is_ok());
}

#[test]
fn distribution_rebalances_into_bounded_shards() {
    let manager = distributed_manager();
    let shards = manager.all_shards();

    assert!(shards.len() >= 3);
    for shard in &shards {
        assert!(shard.len() <= manager.max_blocks_per_shard);
    }

    let ids: Vec<u64> = shards.iter().map(|s| s.id.0).collect();
    let mut unique = ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), ids.len(), "shard IDs must be pairwise distinct");

    let total: usize = shards.iter().map(|s| s.len()).sum();
    assert_eq!(total, 9);
}

#[test]
fn transfer_with_correct_key_commits_and_updates_roots() {
    let manager = distributed_manager();
    let shards = manager.all_shards();
    let (source, dest) = (&shards[0], &shards[1]);

    let source_len = source.len();
    let dest_len = dest.len();
    let moved = source.blocks()[0].clone();

    let sync = EnhancedSyncManager::new(FABRIC_TRANSFER_KEY);
    assert!(sync.create_authenticated_transfer(source, dest, 0));
    assert!(sync.verify_and_apply_transfer(source, dest, 0));

    assert_eq!(source.len(), source_len - 1);
    assert_eq!(dest.len(), dest_len + 1);
    assert_eq!(dest.blocks().last().unwrap(), &moved);

    // Each shard's Merkle root reflects its new payload sequence.
    for shard in [source, dest] {
        let payloads: Vec<String> = shard.blocks().iter().map(|b| b.data.clone()).collect();
        assert_eq!(shard.root(), MerkleTree::new(&payloads).root_hash());
    }
}

#[test]
fn transfer_with_wrong_key_rolls_back() {
    let manager = distributed_manager();
    let shards = manager.all_shards();
    let (source, dest) = (&shards[0], &shards[1]);

    // Scenario precondition: a successful transfer has already happened.
    let good = EnhancedSyncManager::new(FABRIC_TRANSFER_KEY);
    assert!(good.create_authenticated_transfer(source, dest, 0));
    assert!(good.verify_and_apply_transfer(source, dest, 0));

    let source_before = source.blocks();
    let dest_before = dest.blocks();

    let faulty = EnhancedSyncManager::new("wrong-key");
    assert!(faulty.create_authenticated_transfer(source, dest, 0));
    assert!(!faulty.verify_and_apply_transfer(source, dest, 0));

    assert_eq!(source.blocks(), source_before);
    assert_eq!(dest.blocks(), dest_before);

    // Roots equal the roots recomputed from the pre-prepare snapshots.
    let source_payloads: Vec<String> = source_before.iter().map(|b| b.data.clone()).collect();
    let dest_payloads: Vec<String> = dest_before.iter().map(|b| b.data.clone()).collect();
    assert_eq!(source.root(), MerkleTree::new(&source_payloads).root_hash());
    assert_eq!(dest.root(), MerkleTree::new(&dest_payloads).root_hash());
}

#[test]
fn pruning_twenty_blocks_keeps_ten_with_valid_proof() {
    let mut chain = Blockchain::new();
    for i in 1..20 {
        chain.add_block(format!("block {i}"));
    }
    assert_eq!(chain.len(), 20);

    let mut pruner = StatePruner::new(5, 10, true);
    let dropped = pruner.prune_blockchain(&mut chain);

    assert_eq!(dropped, 10);
    assert_eq!(chain.len(), 10);

    let proof = pruner.latest_proof().expect("proof emitted");
    assert!(pruner.verify_integrity(proof));
}
