use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::Block;

/// Chain validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,

    #[error("block at position {position} has index {found}, expected {expected}")]
    NonSequentialIndex {
        position: usize,
        expected: u64,
        found: u64,
    },

    #[error("block {index} does not link to its predecessor's hash")]
    BrokenLink { index: u64 },

    #[error("block {index} hash does not match its content")]
    HashMismatch { index: u64 },
}

/// Ordered, genesis-seeded sequence of hash-linked blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
}

impl Blockchain {
    /// Create a chain seeded with the genesis block.
    pub fn new() -> Self {
        Blockchain {
            blocks: vec![Block::genesis()],
        }
    }

    /// Append a new block carrying `data`, linked to the current tip.
    pub fn add_block(&mut self, data: impl Into<String>) {
        let prev = self
            .blocks
            .last()
            .expect("chain is seeded with genesis and never emptied");
        let block = Block::generate(prev, data);
        self.blocks.push(block);
    }

    /// Latest block in the chain.
    pub fn latest(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Chain height (number of blocks).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Walk the chain and verify index sequence, predecessor links and
    /// hash reproducibility.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.blocks.is_empty() {
            return Err(ChainError::Empty);
        }

        for (position, block) in self.blocks.iter().enumerate() {
            if block.hash != block.compute_hash() {
                return Err(ChainError::HashMismatch { index: block.index });
            }
            if position == 0 {
                continue;
            }
            let prev = &self.blocks[position - 1];
            if block.index != prev.index + 1 {
                return Err(ChainError::NonSequentialIndex {
                    position,
                    expected: prev.index + 1,
                    found: block.index,
                });
            }
            if block.prev_hash != prev.hash {
                return Err(ChainError::BrokenLink { index: block.index });
            }
        }
        Ok(())
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}
