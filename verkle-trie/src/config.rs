//! Trie configuration (spec §6's "Configuration" row): branching width and
//! an optional presized initial batch of key/value pairs.

use verkle_db::NodeStore;

use crate::error::Result;
use crate::node::{Key, Value};
use crate::trie::VerkleTrie;

/// Recognized configuration options for opening a trie.
#[derive(Debug, Clone)]
pub struct TrieConfig {
    /// `WIDTH_BITS ∈ {2,4,6,8,10,12}`.
    pub width_bits: u8,
    /// Key/value pairs to load via the insert-only batch build (§4.2)
    /// immediately after opening, before any `update`/`delete` call.
    pub initial_batch: Option<Vec<(Key, Value)>>,
    /// Seed for the Pedersen basis's placeholder RNG. Reproducible basis
    /// derivation is a non-goal (spec §1); this only needs to stay fixed
    /// for one trie instance's lifetime.
    pub basis_seed: u64,
}

impl TrieConfig {
    pub fn new(width_bits: u8) -> TrieConfig {
        TrieConfig {
            width_bits,
            initial_batch: None,
            basis_seed: 0,
        }
    }

    pub fn with_initial_batch(mut self, batch: Vec<(Key, Value)>) -> TrieConfig {
        self.initial_batch = Some(batch);
        self
    }

    pub fn with_basis_seed(mut self, seed: u64) -> TrieConfig {
        self.basis_seed = seed;
        self
    }

    /// Opens `store` under this configuration, running the initial batch
    /// build (if any) before handing back the trie.
    pub fn open<S: NodeStore>(self, store: S) -> Result<VerkleTrie<S>> {
        let mut trie = VerkleTrie::new(store, self.width_bits, self.basis_seed);
        if let Some(batch) = self.initial_batch {
            trie.insert_build(&batch)?;
        }
        Ok(trie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verkle_db::MemoryDb;

    #[test]
    fn open_without_batch_yields_empty_trie() {
        let trie = TrieConfig::new(8).open(MemoryDb::new()).unwrap();
        assert_eq!(trie.total_depth().unwrap(), 0);
    }

    #[test]
    fn open_with_initial_batch_preloads_entries() {
        let mut key = [0u8; 32];
        key[31] = 5;
        let mut value = [0u8; 32];
        value[31] = 9;
        let config = TrieConfig::new(4)
            .with_initial_batch(vec![(key, value)])
            .with_basis_seed(3);
        let trie = config.open(MemoryDb::new()).unwrap();
        assert_eq!(trie.lookup(key).unwrap(), Some(value));
    }
}
