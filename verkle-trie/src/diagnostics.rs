//! Diagnostics (C8): depth statistics and full structural validation.
//!
//! `check_valid_tree` is the property-5 checker spec §8 names directly
//! ("structural invariants... after any operation"): it recomputes every
//! node's commitment from its children/value rather than trusting the
//! stored `commitment`/`hash` fields, so a corrupted store is caught
//! rather than silently trusted.

use std::collections::BTreeMap;

use verkle_db::NodeStore;

use crate::curve;
use crate::error::{Result, TrieError};
use crate::node::{Node, PathId};
use crate::trie::VerkleTrie;

impl<S: NodeStore> VerkleTrie<S> {
    /// Average leaf depth (number of indices consumed to reach each leaf),
    /// or `0.0` for an empty trie.
    pub fn average_depth(&self) -> Result<f64> {
        let leaves = self.walk_leaves()?;
        if leaves.is_empty() {
            return Ok(0.0);
        }
        let total: usize = leaves.iter().map(|(path, _)| path.len()).sum();
        Ok(total as f64 / leaves.len() as f64)
    }

    /// Sum of all leaf depths — the numerator `average_depth` divides by
    /// `leaf count`, exposed separately for callers that want their own
    /// aggregation.
    pub fn total_depth(&self) -> Result<usize> {
        Ok(self.walk_leaves()?.iter().map(|(path, _)| path.len()).sum())
    }

    /// Recomputes every commitment bottom-up and compares it against the
    /// stored value, and checks that every non-root inner node has either
    /// at least two children or a single *inner* child (spec invariant 2;
    /// a single-leaf-child non-root inner should have collapsed). Returns
    /// `Err(TrieError::Corruption)` describing the first violation found.
    pub fn check_valid_tree(&self) -> Result<()> {
        self.check_subtree(self.root_id(), true)?;
        Ok(())
    }

    fn check_subtree(&self, id: PathId, is_root: bool) -> Result<crate::field::Scalar> {
        match self.load_any(id)? {
            Node::Leaf(leaf) => {
                let expected = crate::node::LeafNode::new(&self.scheme(), leaf.key, leaf.value);
                if expected.commitment != leaf.commitment {
                    return Err(TrieError::Corruption(format!(
                        "leaf commitment mismatch at node {}",
                        hex::encode(id)
                    )));
                }
                if expected.hash != leaf.hash {
                    return Err(TrieError::Corruption(format!("leaf hash mismatch at node {}", hex::encode(id))));
                }
                Ok(leaf.hash)
            }
            Node::Inner(inner) => {
                if !is_root && inner.children.len() == 1 {
                    let &only_child_id = inner.children.values().next().unwrap();
                    if let Node::Leaf(_) = self.load_any(only_child_id)? {
                        return Err(TrieError::Corruption(format!(
                            "non-root inner node {} has a single leaf child; should have collapsed",
                            hex::encode(id)
                        )));
                    }
                }

                let mut child_hashes: BTreeMap<usize, crate::field::Scalar> = BTreeMap::new();
                for (&i, &child_id) in &inner.children {
                    let h = self.check_subtree(child_id, false)?;
                    child_hashes.insert(i, h);
                }
                let expected_commitment = self.scheme().pedersen_commit_sparse(&child_hashes);
                if expected_commitment != inner.commitment {
                    return Err(TrieError::Corruption(format!(
                        "inner commitment mismatch at node {}",
                        hex::encode(id)
                    )));
                }
                let expected_hash = curve::group_to_field(&expected_commitment);
                if expected_hash != inner.hash {
                    return Err(TrieError::Corruption(format!("inner hash mismatch at node {}", hex::encode(id))));
                }
                Ok(inner.hash)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verkle_db::MemoryDb;

    fn key_from_u64(v: u64) -> [u8; 32] {
        let mut k = [0u8; 32];
        k[24..].copy_from_slice(&v.to_be_bytes());
        k
    }

    fn value_from_u64(v: u64) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&v.to_be_bytes());
        out
    }

    #[test]
    fn empty_trie_is_valid_with_zero_average_depth() {
        let trie = VerkleTrie::new(MemoryDb::new(), 8, 1);
        assert!(trie.check_valid_tree().is_ok());
        assert_eq!(trie.average_depth().unwrap(), 0.0);
        assert_eq!(trie.total_depth().unwrap(), 0);
    }

    #[test]
    fn populated_trie_passes_validation() {
        let mut trie = VerkleTrie::new(MemoryDb::new(), 4, 2);
        for i in 0..80u64 {
            trie.update(key_from_u64(i), value_from_u64(i)).unwrap();
        }
        assert!(trie.check_valid_tree().is_ok());
        assert!(trie.average_depth().unwrap() > 0.0);
        let leaves = trie.walk_leaves().unwrap();
        assert_eq!(leaves.len(), 80);
    }

    #[test]
    fn trie_stays_valid_through_deletes() {
        let mut trie = VerkleTrie::new(MemoryDb::new(), 4, 3);
        let keys: Vec<_> = (0..50u64).map(key_from_u64).collect();
        for &k in &keys {
            trie.update(k, value_from_u64(1)).unwrap();
        }
        for &k in keys.iter().step_by(2) {
            trie.delete(k).unwrap();
        }
        assert!(trie.check_valid_tree().is_ok());
    }
}
