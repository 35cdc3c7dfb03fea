use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use ledgersim_core::Blockchain;

/// How states are pruned: `max_height` is the checkpoint granularity,
/// `retention_count` is the number of newest blocks to keep, and
/// `use_checkpoints` rounds the drop count down to a `max_height`
/// multiple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruningPolicy {
    pub max_height: usize,
    pub retention_count: usize,
    pub use_checkpoints: bool,
}

/// Keyed signature over a dropped chain prefix, emitted at pruning time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityProof {
    pub root_hash: String,
    pub pruned_count: usize,
    pub timestamp: DateTime<Utc>,
    pub signature: String,
}

/// Prunes old chain state while retaining tamper-evident checkpoints.
pub struct StatePruner {
    policy: PruningPolicy,
    integrity_proofs: Vec<IntegrityProof>,
    secret_key: String,
}

impl StatePruner {
    pub fn new(max_height: usize, retention_count: usize, use_checkpoints: bool) -> Self {
        StatePruner {
            policy: PruningPolicy {
                max_height,
                retention_count,
                use_checkpoints,
            },
            integrity_proofs: Vec::new(),
            secret_key: "pruning-integrity-key".to_string(),
        }
    }

    fn sign(&self, root_hash: &str, count: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(root_hash.as_bytes());
        hasher.update(count.to_string().as_bytes());
        hasher.update(self.secret_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Drop a prefix of the chain per policy and record an integrity
    /// proof over it. Returns the number of blocks dropped (0 when the
    /// policy yields nothing to prune; no proof is appended then).
    pub fn prune_blockchain(&mut self, chain: &mut Blockchain) -> usize {
        if chain.len() <= self.policy.retention_count {
            return 0;
        }

        let mut prunable = chain.len() - self.policy.retention_count;
        if self.policy.use_checkpoints {
            prunable -= prunable % self.policy.max_height;
        }
        if prunable == 0 {
            return 0;
        }

        let mut hasher = Sha256::new();
        for block in &chain.blocks[..prunable] {
            hasher.update(block.hash.as_bytes());
        }
        let root_hash = hex::encode(hasher.finalize());

        let proof = IntegrityProof {
            signature: self.sign(&root_hash, prunable),
            root_hash,
            pruned_count: prunable,
            timestamp: Utc::now(),
        };
        info!(
            "Pruned {} blocks with integrity proof: {}...",
            prunable,
            &proof.signature[..16]
        );
        self.integrity_proofs.push(proof);

        chain.blocks.drain(..prunable);
        prunable
    }

    /// Recompute the keyed signature for a proof and compare.
    pub fn verify_integrity(&self, proof: &IntegrityProof) -> bool {
        self.sign(&proof.root_hash, proof.pruned_count) == proof.signature
    }

    /// Most recent integrity proof, if any pruning has happened.
    pub fn latest_proof(&self) -> Option<&IntegrityProof> {
        self.integrity_proofs.last()
    }

    /// All proofs, oldest first. Proofs accumulate monotonically.
    pub fn proofs(&self) -> &[IntegrityProof] {
        &self.integrity_proofs
    }
}
