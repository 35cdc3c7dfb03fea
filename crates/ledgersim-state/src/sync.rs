use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};
use thiserror::Error;

use ledgersim_core::Block;

use crate::homomorphic_auth::HomomorphicAuthenticator;
use crate::shard::{Shard, ShardCore, ShardId};

/// Canonical key of the transfer fabric. Transfer commitments are checked
/// against this key at apply time; a manager configured with any other key
/// can prepare under its own key but its commits are rejected and rolled
/// back. (Same pattern as the pruner's built-in integrity key.)
pub const FABRIC_TRANSFER_KEY: &str = "shard-fabric-transfer-key";

/// Failure taxonomy of the transfer protocol. Public operations map these
/// to their boolean result; the variants carry the log detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("invalid block index {index} for Shard #{shard} (block count: {count})")]
    InvalidBlockIndex {
        shard: ShardId,
        index: usize,
        count: usize,
    },

    #[error("transfer {0} not found or not prepared")]
    NotPrepared(String),

    #[error("source and destination are the same shard (#{0})")]
    SameShard(ShardId),

    #[error("invalid commitment for transfer from Shard #{from_shard} to #{dest}")]
    InvalidCommitment { from_shard: ShardId, dest: ShardId },
}

/// State of a pending two-phase transfer, from prepare until commit or
/// rollback. Snapshots are value copies of both shards' block sequences
/// taken before prepare; the Merkle trees are regenerable from payloads.
pub struct TransferState {
    pub source: Arc<Shard>,
    pub dest: Arc<Shard>,
    pub block_index: usize,
    pub commitment: String,
    pub prepared: bool,
    pub source_snapshot: Vec<Block>,
    pub dest_snapshot: Vec<Block>,
}

/// Lock both shards in a fixed global order (lower ID first) to keep the
/// engine deadlock-free. Guards come back positionally: (first, second)
/// correspond to (a, b) regardless of acquisition order.
fn lock_pair<'a>(
    a: &'a Shard,
    b: &'a Shard,
) -> (MutexGuard<'a, ShardCore>, MutexGuard<'a, ShardCore>) {
    if a.id <= b.id {
        let guard_a = a.lock_core();
        let guard_b = b.lock_core();
        (guard_a, guard_b)
    } else {
        let guard_b = b.lock_core();
        let guard_a = a.lock_core();
        (guard_a, guard_b)
    }
}

/// Base cross-shard synchronization: bounds-checked block moves with both
/// Merkle trees rebuilt. Holds the fabric's reference authenticator;
/// authenticated moves are validated against it before any state changes.
pub struct SyncManager {
    reference: HomomorphicAuthenticator,
    mutex: Mutex<()>,
}

impl SyncManager {
    pub fn new() -> Self {
        SyncManager {
            reference: HomomorphicAuthenticator::new(FABRIC_TRANSFER_KEY),
            mutex: Mutex::new(()),
        }
    }

    /// Move the block at `block_index` from `source` to `destination`
    /// (appended at the end), rebuilding both trees. Returns false when
    /// the index is out of range.
    pub fn sync_block(
        &self,
        source: &Arc<Shard>,
        destination: &Arc<Shard>,
        block_index: usize,
    ) -> bool {
        let _serial = self.mutex.lock().unwrap();

        let block = match source.take_block_at(block_index) {
            Some(block) => block,
            None => return false,
        };
        destination.add_block(block);
        true
    }

    /// Authenticated variant used by the 2PC commit path: the stored
    /// commitment must verify against the fabric's reference key before
    /// the block moves. This is where a mis-keyed manager's corruption
    /// surfaces.
    fn sync_authenticated_block(
        &self,
        source: &Arc<Shard>,
        destination: &Arc<Shard>,
        block_index: usize,
        partial_state: &str,
        commitment: &str,
    ) -> Result<(), TransferError> {
        if !self.reference.verify(partial_state, commitment) {
            return Err(TransferError::InvalidCommitment {
                from_shard: source.id,
                dest: destination.id,
            });
        }
        if !self.sync_block(source, destination, block_index) {
            return Err(TransferError::InvalidBlockIndex {
                shard: source.id,
                index: block_index,
                count: source.len(),
            });
        }
        Ok(())
    }
}

impl Default for SyncManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Two-phase cross-shard block transfer with authenticated commitments.
///
/// Transfer lifecycle: Initiated → Prepared → (Committed | RolledBack).
/// Prepare and commit both run under the manager-wide lock and always use
/// this manager's own authenticator instance; the key never diverges
/// within a single transfer. All operations are total: failures return
/// false and leave both shards in their pre-prepare state.
pub struct EnhancedSyncManager {
    sync_manager: SyncManager,
    authenticator: HomomorphicAuthenticator,
    pending_transfers: Mutex<HashMap<String, TransferState>>,
}

impl EnhancedSyncManager {
    pub fn new(key: &str) -> Self {
        EnhancedSyncManager {
            sync_manager: SyncManager::new(),
            authenticator: HomomorphicAuthenticator::new(key),
            pending_transfers: Mutex::new(HashMap::new()),
        }
    }

    /// Transfer IDs are unique per in-flight transfer; concurrent
    /// duplicates are the caller's responsibility to avoid.
    fn transfer_id(source: &Shard, dest: &Shard, block_index: usize) -> String {
        format!("{}-{}-{}", source.id, dest.id, block_index)
    }

    fn partial_state(block: &Block) -> String {
        format!("{}:{}", block.hash, block.data)
    }

    /// Phase 1: validate, commit to the block's partial state, snapshot
    /// both shards and record the pending transfer. Returns false (with
    /// a log line) on any failure, leaving all state untouched.
    pub fn create_authenticated_transfer(
        &self,
        source: &Arc<Shard>,
        destination: &Arc<Shard>,
        block_index: usize,
    ) -> bool {
        let mut pending = self.pending_transfers.lock().unwrap();

        match self.prepare_transfer(source, destination, block_index) {
            Ok(state) => {
                let id = Self::transfer_id(source, destination, block_index);
                pending.insert(id, state);
                true
            }
            Err(err) => {
                warn!("Prepare failed: {err}");
                false
            }
        }
    }

    fn prepare_transfer(
        &self,
        source: &Arc<Shard>,
        destination: &Arc<Shard>,
        block_index: usize,
    ) -> Result<TransferState, TransferError> {
        if source.id == destination.id {
            return Err(TransferError::SameShard(source.id));
        }

        let source_snapshot = source.blocks();
        let dest_snapshot = destination.blocks();

        let block = source_snapshot.get(block_index).ok_or_else(|| {
            TransferError::InvalidBlockIndex {
                shard: source.id,
                index: block_index,
                count: source_snapshot.len(),
            }
        })?;

        let partial = Self::partial_state(block);
        let commitment = self.authenticator.authenticate(&partial);

        // Hold both shard locks for the validation window and re-derive
        // the partial state from the locked sequences.
        {
            let (source_core, _dest_core) = lock_pair(source, destination);
            let locked_block = source_core.blocks.get(block_index).ok_or_else(|| {
                TransferError::InvalidBlockIndex {
                    shard: source.id,
                    index: block_index,
                    count: source_core.blocks.len(),
                }
            })?;
            let locked_partial = Self::partial_state(locked_block);
            if !self.authenticator.verify(&locked_partial, &commitment) {
                return Err(TransferError::InvalidCommitment {
                    from_shard: source.id,
                    dest: destination.id,
                });
            }
        }

        Ok(TransferState {
            source: source.clone(),
            dest: destination.clone(),
            block_index,
            commitment,
            prepared: true,
            source_snapshot,
            dest_snapshot,
        })
    }

    /// Phase 2: commit or roll back. The stored commitment is re-verified
    /// by this manager's own authenticator, then the authenticated move
    /// checks it against the fabric reference. Any failure restores both
    /// snapshots, rebuilds both trees and returns false.
    pub fn verify_and_apply_transfer(
        &self,
        source: &Arc<Shard>,
        destination: &Arc<Shard>,
        block_index: usize,
    ) -> bool {
        let mut pending = self.pending_transfers.lock().unwrap();
        let id = Self::transfer_id(source, destination, block_index);

        let state = match pending.get(&id) {
            Some(state) if state.prepared => state,
            _ => {
                warn!("{}", TransferError::NotPrepared(id));
                return false;
            }
        };

        let result = self.apply(state, source, destination, block_index);
        match result {
            Ok(()) => {
                info!(
                    "Committed transfer from Shard #{} to #{}",
                    source.id, destination.id
                );
                pending.remove(&id);
                true
            }
            Err(err) => {
                warn!("Transfer {id} failed: {err}");
                let state = pending.remove(&id).expect("entry present under lock");
                source.restore(state.source_snapshot);
                destination.restore(state.dest_snapshot);
                info!(
                    "Rolled back transfer from Shard #{} to #{}",
                    source.id, destination.id
                );
                false
            }
        }
    }

    fn apply(
        &self,
        state: &TransferState,
        source: &Arc<Shard>,
        destination: &Arc<Shard>,
        block_index: usize,
    ) -> Result<(), TransferError> {
        let blocks = source.blocks();
        let block = blocks.get(block_index).ok_or_else(|| {
            TransferError::InvalidBlockIndex {
                shard: source.id,
                index: block_index,
                count: blocks.len(),
            }
        })?;

        let partial = Self::partial_state(block);
        if !self.authenticator.verify(&partial, &state.commitment) {
            return Err(TransferError::InvalidCommitment {
                from_shard: source.id,
                dest: destination.id,
            });
        }

        self.sync_manager.sync_authenticated_block(
            source,
            destination,
            block_index,
            &partial,
            &state.commitment,
        )
    }

    /// Number of transfers currently pending (prepared, not yet applied).
    pub fn pending_count(&self) -> usize {
        self.pending_transfers.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersim_core::Blockchain;

    fn shard_with(id: u64, blocks: Vec<Block>) -> Arc<Shard> {
        Arc::new(Shard::with_blocks(ShardId(id), blocks))
    }

    fn chain_blocks(n: usize) -> Vec<Block> {
        let mut chain = Blockchain::new();
        for i in 1..n {
            chain.add_block(format!("payload {i}"));
        }
        chain.blocks
    }

    #[test]
    fn test_sync_block_moves_and_rebuilds() {
        let blocks = chain_blocks(4);
        let source = shard_with(0, blocks[..3].to_vec());
        let dest = shard_with(1, blocks[3..].to_vec());

        let sync = SyncManager::new();
        assert!(sync.sync_block(&source, &dest, 1));

        assert_eq!(source.len(), 2);
        assert_eq!(dest.len(), 2);
        // The moved block is appended at the end.
        assert_eq!(dest.blocks()[1], blocks[1]);
    }

    #[test]
    fn test_sync_block_rejects_out_of_range() {
        let source = shard_with(0, chain_blocks(2));
        let dest = shard_with(1, Vec::new());
        let sync = SyncManager::new();
        assert!(!sync.sync_block(&source, &dest, 5));
        assert_eq!(source.len(), 2);
        assert!(dest.is_empty());
    }

    #[test]
    fn test_prepare_rejects_invalid_index() {
        let source = shard_with(0, chain_blocks(2));
        let dest = shard_with(1, Vec::new());
        let manager = EnhancedSyncManager::new(FABRIC_TRANSFER_KEY);
        assert!(!manager.create_authenticated_transfer(&source, &dest, 7));
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_prepare_rejects_same_shard() {
        let source = shard_with(0, chain_blocks(2));
        let manager = EnhancedSyncManager::new(FABRIC_TRANSFER_KEY);
        assert!(!manager.create_authenticated_transfer(&source, &source, 0));
    }

    #[test]
    fn test_commit_without_prepare_fails() {
        let source = shard_with(0, chain_blocks(2));
        let dest = shard_with(1, Vec::new());
        let manager = EnhancedSyncManager::new(FABRIC_TRANSFER_KEY);
        assert!(!manager.verify_and_apply_transfer(&source, &dest, 0));
    }

    #[test]
    fn test_transfer_with_fabric_key_commits() {
        let blocks = chain_blocks(4);
        let source = shard_with(0, blocks[..2].to_vec());
        let dest = shard_with(1, blocks[2..].to_vec());
        let moved = blocks[0].clone();

        let manager = EnhancedSyncManager::new(FABRIC_TRANSFER_KEY);
        assert!(manager.create_authenticated_transfer(&source, &dest, 0));
        assert!(manager.verify_and_apply_transfer(&source, &dest, 0));

        assert_eq!(source.len(), 1);
        assert_eq!(dest.len(), 3);
        assert_eq!(dest.blocks()[2], moved);
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_transfer_with_wrong_key_rolls_back() {
        let blocks = chain_blocks(4);
        let source = shard_with(0, blocks[..2].to_vec());
        let dest = shard_with(1, blocks[2..].to_vec());
        let source_before = source.blocks();
        let dest_before = dest.blocks();

        let manager = EnhancedSyncManager::new("wrong-key");
        // Prepare succeeds under the manager's own key.
        assert!(manager.create_authenticated_transfer(&source, &dest, 0));
        // Commit is rejected by the fabric reference and rolled back.
        assert!(!manager.verify_and_apply_transfer(&source, &dest, 0));

        assert_eq!(source.blocks(), source_before);
        assert_eq!(dest.blocks(), dest_before);
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_rollback_restores_merkle_roots() {
        let blocks = chain_blocks(5);
        let source = shard_with(0, blocks[..3].to_vec());
        let dest = shard_with(1, blocks[3..].to_vec());
        let source_root = source.root();
        let dest_root = dest.root();

        let manager = EnhancedSyncManager::new("wrong-key");
        assert!(manager.create_authenticated_transfer(&source, &dest, 1));
        assert!(!manager.verify_and_apply_transfer(&source, &dest, 1));

        assert_eq!(source.root(), source_root);
        assert_eq!(dest.root(), dest_root);
    }

    #[test]
    fn test_commit_fails_when_source_mutated_after_prepare() {
        let blocks = chain_blocks(5);
        let source = shard_with(0, blocks[..3].to_vec());
        let dest = shard_with(1, blocks[3..].to_vec());

        let manager = EnhancedSyncManager::new(FABRIC_TRANSFER_KEY);
        assert!(manager.create_authenticated_transfer(&source, &dest, 0));

        // The committed-to block changes between prepare and commit.
        let mut tampered = source.blocks();
        tampered[0].data = "rewritten".to_string();
        tampered[0].hash = tampered[0].compute_hash();
        source.restore(tampered);

        assert!(!manager.verify_and_apply_transfer(&source, &dest, 0));
        // Rollback restores the pre-prepare sequences.
        assert_eq!(source.blocks(), blocks[..3].to_vec());
        assert_eq!(dest.blocks(), blocks[3..].to_vec());
    }
}
