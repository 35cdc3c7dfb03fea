use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use log::info;

use ledgersim_core::Block;

use crate::shard::{Shard, ShardId};
use crate::shard_index::ShardIndex;

/// Default lower bound of blocks a shard should hold before it becomes a
/// merge candidate.
pub const MIN_BLOCKS_PER_SHARD: usize = 2;

/// Default upper bound of blocks per shard; exceeding it triggers a split.
pub const MAX_BLOCKS_PER_SHARD: usize = 3;

/// Shard lifecycle policies: block distribution, split rebalancing,
/// adjacent-shard merging and state reconstruction over the balanced
/// shard index.
///
/// INVARIANTS:
/// 1. Shard IDs are unique across the index; split-born IDs are strictly
///    greater than all pre-split IDs
/// 2. After rebalancing, no shard exceeds `max_blocks_per_shard`
/// 3. The union of all shards' blocks equals the distributed set
///    (subject to cross-shard transfer moves)
pub struct ShardManager {
    index: ShardIndex,
    pub min_blocks_per_shard: usize,
    pub max_blocks_per_shard: usize,
}

impl ShardManager {
    /// Bootstrap with a single seed shard of ID 0.
    pub fn new() -> Self {
        Self::with_limits(MIN_BLOCKS_PER_SHARD, MAX_BLOCKS_PER_SHARD)
    }

    pub fn with_limits(min_blocks_per_shard: usize, max_blocks_per_shard: usize) -> Self {
        let mut index = ShardIndex::new();
        index.insert(Arc::new(Shard::new(ShardId(0))));
        ShardManager {
            index,
            min_blocks_per_shard,
            max_blocks_per_shard,
        }
    }

    /// Append a block to the active shard (highest ID in the enumeration)
    /// and rebalance.
    pub fn distribute_block(&mut self, block: Block) {
        let shards = self.index.all_shards();
        let last = shards
            .last()
            .expect("index is bootstrapped with a seed shard");
        last.add_block(block);

        self.rebalance();
    }

    /// Split every shard that exceeds the upper bound at its midpoint.
    ///
    /// The index is rebuilt from scratch each pass (no in-place surgery):
    /// the left half keeps the original ID, the right half becomes a new
    /// shard whose ID continues from the current shard count.
    pub fn rebalance(&mut self) {
        let current = self.index.all_shards();
        let mut rebuilt = ShardIndex::new();
        let mut next_id = current.len() as u64;

        for shard in current {
            if shard.len() > self.max_blocks_per_shard {
                let blocks = shard.blocks();
                let mid = blocks.len() / 2;

                shard.restore(blocks[..mid].to_vec());
                rebuilt.insert(shard.clone());

                let split = Arc::new(Shard::with_blocks(ShardId(next_id), blocks[mid..].to_vec()));
                info!(
                    "Split Shard #{} at midpoint; right half became Shard #{}",
                    shard.id, split.id
                );
                rebuilt.insert(split);
                next_id += 1;
            } else {
                rebuilt.insert(shard);
            }
        }

        self.index = rebuilt;
    }

    /// Single-pass merge of adjacent underutilized shards.
    ///
    /// A shard holding fewer than `threshold` blocks absorbs its successor
    /// in enumeration order; both are marked used so a merged shard is not
    /// a candidate again within the same invocation.
    pub fn merge_shards(&mut self, threshold: usize) {
        let current = self.index.all_shards();
        let mut rebuilt = ShardIndex::new();
        let mut used: HashSet<usize> = HashSet::new();

        for i in 0..current.len() {
            if used.contains(&i) {
                continue;
            }
            let shard = &current[i];

            if shard.len() < threshold && i + 1 < current.len() && !used.contains(&(i + 1)) {
                let next = &current[i + 1];

                let mut merged = shard.blocks();
                merged.extend(next.blocks());
                shard.restore(merged);

                rebuilt.insert(shard.clone());
                used.insert(i);
                used.insert(i + 1);

                info!(
                    "[MERGE] Shard #{} and Shard #{} merged into Shard #{}",
                    shard.id, next.id, shard.id
                );
            } else {
                rebuilt.insert(shard.clone());
                used.insert(i);
            }
        }

        self.index = rebuilt;
    }

    /// Retrieve a shard by ID in O(log n) time.
    pub fn find_shard(&self, id: ShardId) -> Option<Arc<Shard>> {
        self.index.find(id)
    }

    /// Merkle root of a shard, for state verification.
    pub fn reconstruct_state(&self, id: ShardId) -> Option<String> {
        self.find_shard(id).map(|shard| shard.root())
    }

    /// All shards in canonical enumeration order.
    pub fn all_shards(&self) -> Vec<Arc<Shard>> {
        self.index.all_shards()
    }

    pub fn shard_count(&self) -> usize {
        self.index.len()
    }

    /// Per-shard report plus the index structure, for the demonstration
    /// driver.
    pub fn format_shard_state(&self) -> String {
        let mut out = String::from("==== Shard Merkle Forest ====\n");
        for shard in self.index.all_shards() {
            let _ = writeln!(
                out,
                "Shard #{} → Root: {} | Blocks: {}",
                shard.id,
                shard.root(),
                shard.len()
            );
        }
        out.push_str(&self.index.format_tree());
        out
    }
}

impl Default for ShardManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersim_core::Blockchain;

    fn chain_blocks(n: usize) -> Vec<Block> {
        let mut chain = Blockchain::new();
        for i in 1..n {
            chain.add_block(format!("payload {i}"));
        }
        chain.blocks
    }

    fn distribute(manager: &mut ShardManager, blocks: &[Block]) {
        for block in blocks {
            manager.distribute_block(block.clone());
        }
    }

    #[test]
    fn test_bootstrap_has_seed_shard_zero() {
        let manager = ShardManager::new();
        assert_eq!(manager.shard_count(), 1);
        assert!(manager.find_shard(ShardId(0)).is_some());
    }

    #[test]
    fn test_rebalance_bounds_every_shard() {
        let mut manager = ShardManager::new();
        distribute(&mut manager, &chain_blocks(9));

        let shards = manager.all_shards();
        assert!(shards.len() >= 3);
        for shard in &shards {
            assert!(shard.len() <= manager.max_blocks_per_shard);
        }

        let total: usize = shards.iter().map(|s| s.len()).sum();
        assert_eq!(total, 9);
    }

    #[test]
    fn test_shard_ids_are_unique_and_splits_grow_ids() {
        let mut manager = ShardManager::new();
        distribute(&mut manager, &chain_blocks(9));

        let ids: Vec<u64> = manager.all_shards().iter().map(|s| s.id.0).collect();
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids, deduped, "enumeration must be strictly sorted");
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_split_preserves_block_order() {
        let mut manager = ShardManager::new();
        let blocks = chain_blocks(9);
        distribute(&mut manager, &blocks);

        let mut recombined: Vec<Block> = Vec::new();
        for shard in manager.all_shards() {
            recombined.extend(shard.blocks());
        }
        // Midpoint splits keep relative order within each shard; every
        // distributed block must still be present exactly once.
        assert_eq!(recombined.len(), blocks.len());
        for block in &blocks {
            assert_eq!(
                recombined.iter().filter(|b| b.hash == block.hash).count(),
                1
            );
        }
    }

    #[test]
    fn test_merge_absorbs_small_neighbour() {
        let mut manager = ShardManager::new();
        distribute(&mut manager, &chain_blocks(9));
        let before = manager.shard_count();
        let total_before: usize = manager.all_shards().iter().map(|s| s.len()).sum();

        manager.merge_shards(3);

        let total_after: usize = manager.all_shards().iter().map(|s| s.len()).sum();
        assert_eq!(total_before, total_after);
        assert!(manager.shard_count() < before);
    }

    #[test]
    fn test_merge_is_single_pass() {
        let mut manager = ShardManager::with_limits(2, 100);
        // Four shards of one block each; a single pass pairs them up.
        let blocks = chain_blocks(4);
        let mut index = ShardIndex::new();
        for (i, block) in blocks.iter().enumerate() {
            index.insert(Arc::new(Shard::with_blocks(
                ShardId(i as u64),
                vec![block.clone()],
            )));
        }
        manager.index = index;

        manager.merge_shards(2);
        // 0+1 merge, 2+3 merge; merged shards are not re-candidates.
        assert_eq!(manager.shard_count(), 2);
        let lens: Vec<usize> = manager.all_shards().iter().map(|s| s.len()).collect();
        assert_eq!(lens, vec![2, 2]);
    }

    #[test]
    fn test_reconstruct_state_matches_shard_root() {
        let mut manager = ShardManager::new();
        distribute(&mut manager, &chain_blocks(5));

        let shard = manager.find_shard(ShardId(0)).expect("seed shard exists");
        assert_eq!(manager.reconstruct_state(ShardId(0)), Some(shard.root()));
        assert_eq!(manager.reconstruct_state(ShardId(99)), None);
    }

    #[test]
    fn test_report_lists_every_shard() {
        let mut manager = ShardManager::new();
        distribute(&mut manager, &chain_blocks(9));
        let report = manager.format_shard_state();
        for shard in manager.all_shards() {
            assert!(report.contains(&format!("Shard #{}", shard.id)));
        }
    }
}
