use std::collections::BTreeMap;
use std::fmt::Write as _;

use sha2::{Digest, Sha256};

/// A node in the succinct trie: byte-indexed children, an optional stored
/// value and the digest committing to the subtree.
#[derive(Debug, Clone, Default)]
pub struct TrieNode {
    children: BTreeMap<u8, TrieNode>,
    value: String,
    digest: String,
}

impl TrieNode {
    /// Digest rule: SHA-256 over (value || Σ children of (byte || digest)).
    /// Children iterate in ascending byte order so roots are portable
    /// across rebuilds.
    fn compute_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.value.as_bytes());
        for (byte, child) in &self.children {
            hasher.update([*byte]);
            hasher.update(child.digest.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    fn rehash(&mut self) {
        for child in self.children.values_mut() {
            child.rehash();
        }
        self.digest = self.compute_digest();
    }
}

/// Compact state trie keyed by arbitrary byte strings (block hashes),
/// valued by block payloads. The root digest is a Merkle root over the
/// stored set, recomputed bottom-up after every insert.
#[derive(Debug, Clone)]
pub struct SuccinctTrie {
    root: TrieNode,
}

impl SuccinctTrie {
    pub fn new() -> Self {
        let mut root = TrieNode::default();
        root.digest = root.compute_digest();
        SuccinctTrie { root }
    }

    /// Insert a key-value pair, creating missing children along the key
    /// path, then re-hash the whole tree bottom-up.
    pub fn insert(&mut self, key: &str, value: &str) {
        let mut current = &mut self.root;
        for byte in key.bytes() {
            current = current.children.entry(byte).or_default();
        }
        current.value = value.to_string();
        self.root.rehash();
    }

    /// Look up a key; returns the stored value only when the walk reaches
    /// a terminal node holding a non-empty value.
    pub fn get(&self, key: &str) -> Option<&str> {
        let mut current = &self.root;
        for byte in key.bytes() {
            current = current.children.get(&byte)?;
        }
        if current.value.is_empty() {
            None
        } else {
            Some(&current.value)
        }
    }

    /// Root digest over the stored set.
    pub fn merkle_root(&self) -> &str {
        &self.root.digest
    }

    /// Indented rendering of the trie structure, for the demonstration
    /// driver.
    pub fn format_tree(&self) -> String {
        let mut out = String::new();
        Self::format_node(&self.root, 0, &mut out);
        out
    }

    fn format_node(node: &TrieNode, level: usize, out: &mut String) {
        let prefix = "  ".repeat(level);
        if node.value.is_empty() {
            let _ = writeln!(out, "{prefix}Node: Hash={}", node.digest);
        } else {
            let _ = writeln!(out, "{prefix}Leaf: Value={}, Hash={}", node.value, node.digest);
        }
        for (byte, child) in &node.children {
            let _ = writeln!(out, "{prefix}  Child [{}]:", *byte as char);
            Self::format_node(child, level + 1, out);
        }
    }
}

impl Default for SuccinctTrie {
    fn default() -> Self {
        Self::new()
    }
}
