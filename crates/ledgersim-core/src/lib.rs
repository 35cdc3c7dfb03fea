// === Hash-Linked Chain Primitives ===
pub mod block;
pub mod blockchain;
pub mod merkle_tree;

// === Re-exports for broader ecosystem access ===
pub use block::Block;
pub use blockchain::{Blockchain, ChainError};
pub use merkle_tree::MerkleTree;
