use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use ledgersim_core::Block;

use crate::succinct_trie::SuccinctTrie;

/// Compact record of a block evicted from the active window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedBlock {
    pub index: u64,
    pub data: String,
    pub hash: String,
}

/// Active/archive split over the chain with a succinct trie per side.
///
/// The active window is bounded: exceeding `max_active_count` spills the
/// oldest block into the archive list and archive trie. Evicted keys are
/// retained in the active trie, so historical data stays discoverable by
/// hash; `active_blocks` is the authority for active membership.
pub struct StateManager {
    active_blocks: Vec<Block>,
    archived_blocks: Vec<ArchivedBlock>,
    active_trie: SuccinctTrie,
    archive_trie: SuccinctTrie,
    max_active_count: usize,
}

impl StateManager {
    pub fn new(max_active_count: usize) -> Self {
        StateManager {
            active_blocks: Vec::new(),
            archived_blocks: Vec::new(),
            active_trie: SuccinctTrie::new(),
            archive_trie: SuccinctTrie::new(),
            max_active_count,
        }
    }

    /// Ingest a block: append to the active window and index it in the
    /// active trie; evict the oldest block into the archive when the
    /// window overflows.
    pub fn add_block(&mut self, block: &Block) {
        self.active_blocks.push(block.clone());
        self.active_trie.insert(&block.hash, &block.data);

        if self.active_blocks.len() > self.max_active_count {
            let archived = self.active_blocks.remove(0);
            self.archive_trie.insert(&archived.hash, &archived.data);
            self.archived_blocks.push(ArchivedBlock {
                index: archived.index,
                data: archived.data,
                hash: archived.hash,
            });
        }
    }

    /// Resolve a block payload by hash: the active trie first, then the
    /// archive.
    pub fn lookup(&self, hash: &str) -> Option<&str> {
        self.active_trie.get(hash).or_else(|| self.archive_trie.get(hash))
    }

    /// Merkle root of the active trie.
    pub fn active_root(&self) -> &str {
        self.active_trie.merkle_root()
    }

    /// Merkle root of the archive trie.
    pub fn archive_root(&self) -> &str {
        self.archive_trie.merkle_root()
    }

    pub fn active_blocks(&self) -> &[Block] {
        &self.active_blocks
    }

    pub fn archived_blocks(&self) -> &[ArchivedBlock] {
        &self.archived_blocks
    }

    /// Active window and archive status, for the demonstration driver.
    pub fn format_state(&self) -> String {
        let mut out = String::from("--- State Manager ---\n");
        let _ = writeln!(out, "Active Blocks: {}", self.active_blocks.len());
        for block in &self.active_blocks {
            let _ = writeln!(out, "Block #{} - Hash: {}", block.index, block.hash);
        }
        let _ = writeln!(out, "Active Trie Merkle Root: {}", self.active_root());
        let _ = writeln!(out, "Archived Blocks: {}", self.archived_blocks.len());
        let _ = writeln!(out, "Archive Trie Merkle Root: {}", self.archive_root());
        out
    }
}
