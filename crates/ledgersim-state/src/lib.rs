// === Shard Lifecycle Engine ===
pub mod shard;
pub mod shard_index;
pub mod shard_manager;

// === Cross-Shard Transfer (2PC) ===
pub mod homomorphic_auth;
pub mod sync;

// === State Retention & Tamper Evidence ===
pub mod accumulator;
pub mod state_manager;
pub mod state_pruning;
pub mod succinct_trie;

// === Re-exports for broader ecosystem access ===
pub use accumulator::RsaAccumulator;
pub use homomorphic_auth::{HomomorphicAuthenticator, HomomorphicCommitment};
pub use shard::{Shard, ShardId};
pub use shard_index::ShardIndex;
pub use shard_manager::ShardManager;
pub use state_manager::{ArchivedBlock, StateManager};
pub use state_pruning::{IntegrityProof, PruningPolicy, StatePruner};
pub use succinct_trie::SuccinctTrie;
pub use sync::{EnhancedSyncManager, SyncManager, FABRIC_TRANSFER_KEY};
