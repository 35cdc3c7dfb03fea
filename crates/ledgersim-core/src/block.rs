use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single block in the hash-linked chain.
///
/// INVARIANTS:
/// 1. `hash` is reproducible as SHA-256 over the textual concatenation of
///    index, timestamp, data and prev_hash
/// 2. Blocks are immutable once generated; downstream components copy them
///    by value (shards may hold duplicates of chain blocks)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block height in the chain
    pub index: u64,

    /// Block creation timestamp (wall clock, textual form)
    pub timestamp: String,

    /// Opaque block payload
    pub data: String,

    /// Hash of the previous block; empty for genesis
    pub prev_hash: String,

    /// SHA-256 self-hash over the four fields above
    pub hash: String,
}

impl Block {
    /// Create the genesis block: index 0, empty previous hash.
    pub fn genesis() -> Self {
        let mut genesis = Block {
            index: 0,
            timestamp: Utc::now().to_rfc3339(),
            data: "Genesis Block".to_string(),
            prev_hash: String::new(),
            hash: String::new(),
        };
        genesis.hash = genesis.compute_hash();
        genesis
    }

    /// Generate a successor block linked to `prev`.
    pub fn generate(prev: &Block, data: impl Into<String>) -> Self {
        let mut block = Block {
            index: prev.index + 1,
            timestamp: Utc::now().to_rfc3339(),
            data: data.into(),
            prev_hash: prev.hash.clone(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Recompute the self-hash from the other four fields.
    ///
    /// Use this to verify that `hash` matches the actual content.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}{}{}{}",
            self.index, self.timestamp, self.data, self.prev_hash
        ));
        hex::encode(hasher.finalize())
    }
}
