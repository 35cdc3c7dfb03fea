use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Binary hash tree over an ordered leaf sequence.
///
/// Leaves are SHA-256 digests of the input strings, hex-encoded. Parents
/// hash the concatenation of their children's *hex strings*. When a level
/// holds an odd count, the unpaired node is promoted unchanged to the next
/// level. An empty input yields the digest of the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTree {
    root: String,
    leaves: Vec<String>,
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

impl MerkleTree {
    /// Build a tree from an ordered list of payload strings.
    pub fn new(data: &[String]) -> Self {
        if data.is_empty() {
            return MerkleTree {
                root: sha256_hex(b""),
                leaves: Vec::new(),
            };
        }

        let leaves: Vec<String> = data.iter().map(|d| sha256_hex(d.as_bytes())).collect();
        MerkleTree {
            root: Self::build(leaves.clone()),
            leaves,
        }
    }

    fn build(mut level: Vec<String>) -> String {
        while level.len() > 1 {
            let mut parents = Vec::with_capacity((level.len() + 1) / 2);
            for pair in level.chunks(2) {
                if pair.len() == 2 {
                    parents.push(sha256_hex(format!("{}{}", pair[0], pair[1]).as_bytes()));
                } else {
                    // Unpaired node is promoted, not duplicated.
                    parents.push(pair[0].clone());
                }
            }
            level = parents;
        }
        level.remove(0)
    }

    /// The root digest.
    pub fn root_hash(&self) -> &str {
        &self.root
    }

    /// Hex-encoded leaf digests, in input order.
    pub fn leaves(&self) -> &[String] {
        &self.leaves
    }
}
