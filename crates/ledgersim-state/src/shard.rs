use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use ledgersim_core::{Block, MerkleTree};

/// ShardId uniquely identifies a shard in the index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ShardId(pub u64);

impl ShardId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable shard interior: the ordered block sequence and the Merkle tree
/// rebuilt over the block payloads on every mutation.
#[derive(Debug, Default)]
pub(crate) struct ShardCore {
    pub(crate) blocks: Vec<Block>,
    pub(crate) tree: Option<MerkleTree>,
}

impl ShardCore {
    pub(crate) fn rebuild_tree(&mut self) {
        let data: Vec<String> = self.blocks.iter().map(|b| b.data.clone()).collect();
        self.tree = Some(MerkleTree::new(&data));
    }
}

/// An ordered block collection with its own Merkle commitment.
///
/// Mutations are serialized by the shard's exclusive lock. Shards are
/// shared as `Arc<Shard>` between the index, the manager and the transfer
/// engine; the rebuilt-on-mutation tree keeps the commitment in step with
/// the payload sequence.
#[derive(Debug)]
pub struct Shard {
    pub id: ShardId,
    inner: Mutex<ShardCore>,
}

impl Shard {
    /// Create an empty shard.
    pub fn new(id: ShardId) -> Self {
        Shard {
            id,
            inner: Mutex::new(ShardCore::default()),
        }
    }

    /// Create a shard pre-populated with `blocks`; the Merkle tree is
    /// built immediately.
    pub fn with_blocks(id: ShardId, blocks: Vec<Block>) -> Self {
        let shard = Shard::new(id);
        shard.restore(blocks);
        shard
    }

    pub(crate) fn lock_core(&self) -> MutexGuard<'_, ShardCore> {
        self.inner.lock().unwrap()
    }

    /// Append a block and rebuild the Merkle tree from the payloads.
    pub fn add_block(&self, block: Block) {
        let mut core = self.lock_core();
        core.blocks.push(block);
        core.rebuild_tree();
    }

    /// Current Merkle root, or empty when no tree has been built.
    pub fn root(&self) -> String {
        let core = self.lock_core();
        core.tree
            .as_ref()
            .map(|t| t.root_hash().to_string())
            .unwrap_or_default()
    }

    /// Number of blocks currently held.
    pub fn len(&self) -> usize {
        self.lock_core().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the ordered block sequence (copied by value).
    pub fn blocks(&self) -> Vec<Block> {
        self.lock_core().blocks.clone()
    }

    /// Copy of the block at `index`, if present.
    pub fn block_at(&self, index: usize) -> Option<Block> {
        self.lock_core().blocks.get(index).cloned()
    }

    /// Replace the block sequence wholesale and rebuild the tree.
    /// Used by rebalancing and by 2PC rollback.
    pub fn restore(&self, blocks: Vec<Block>) {
        let mut core = self.lock_core();
        core.blocks = blocks;
        core.rebuild_tree();
    }

    /// Remove and return the block at `index`, rebuilding the tree.
    pub fn take_block_at(&self, index: usize) -> Option<Block> {
        let mut core = self.lock_core();
        if index >= core.blocks.len() {
            return None;
        }
        let block = core.blocks.remove(index);
        core.rebuild_tree();
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersim_core::Blockchain;

    fn sample_blocks(n: usize) -> Vec<Block> {
        let mut chain = Blockchain::new();
        for i in 1..n {
            chain.add_block(format!("payload {i}"));
        }
        chain.blocks
    }

    #[test]
    fn test_empty_shard_has_no_root() {
        let shard = Shard::new(ShardId(0));
        assert!(shard.is_empty());
        assert_eq!(shard.root(), "");
    }

    #[test]
    fn test_add_block_rebuilds_tree() {
        let shard = Shard::new(ShardId(0));
        let blocks = sample_blocks(3);
        shard.add_block(blocks[0].clone());
        let root_one = shard.root();
        shard.add_block(blocks[1].clone());
        assert_ne!(shard.root(), root_one);
        assert_eq!(shard.len(), 2);
    }

    #[test]
    fn test_root_matches_payload_sequence() {
        let blocks = sample_blocks(4);
        let shard = Shard::with_blocks(ShardId(7), blocks.clone());

        let data: Vec<String> = blocks.iter().map(|b| b.data.clone()).collect();
        let expected = MerkleTree::new(&data);
        assert_eq!(shard.root(), expected.root_hash());
    }

    #[test]
    fn test_take_block_preserves_order() {
        let blocks = sample_blocks(4);
        let shard = Shard::with_blocks(ShardId(1), blocks.clone());

        let taken = shard.take_block_at(1).expect("index in range");
        assert_eq!(taken, blocks[1]);

        let remaining = shard.blocks();
        assert_eq!(remaining, vec![blocks[0].clone(), blocks[2].clone(), blocks[3].clone()]);
        assert!(shard.take_block_at(10).is_none());
    }

    #[test]
    fn test_restore_replaces_sequence_and_root() {
        let blocks = sample_blocks(4);
        let shard = Shard::with_blocks(ShardId(2), blocks.clone());
        let full_root = shard.root();

        shard.restore(blocks[..2].to_vec());
        assert_eq!(shard.len(), 2);
        assert_ne!(shard.root(), full_root);

        shard.restore(blocks);
        assert_eq!(shard.root(), full_root);
    }
}
