//! Property-based coverage for spec §8's universal invariants that are
//! naturally generative: read-after-write (1), delete removes (2),
//! root-stability under permutation (3), and index derivation bounds (7).
//! Structural invariants (4) and proof soundness/order-independence (5/6)
//! are covered by deterministic unit/integration tests instead, since they
//! hinge on specific cryptographic tampering rather than arbitrary input.

use std::collections::HashMap;

use proptest::prelude::*;

use verkle_db::MemoryDb;
use verkle_trie::node::{Key, Value};
use verkle_trie::trie::indices;
use verkle_trie::{TrieError, VerkleTrie};

fn arb_key() -> impl Strategy<Value = Key> {
    prop::array::uniform32(any::<u8>())
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop::array::uniform32(any::<u8>())
}

proptest! {
    /// Property 1: lookup after a sequence of writes (no intervening
    /// deletes) returns the last value written for every key.
    #[test]
    fn read_after_write(entries in prop::collection::vec((arb_key(), arb_value()), 1..40)) {
        let mut trie = VerkleTrie::new(MemoryDb::new(), 4, 11);
        let mut last: HashMap<Key, Value> = HashMap::new();
        for (k, v) in entries {
            trie.update(k, v).unwrap();
            last.insert(k, v);
        }
        for (k, v) in last {
            prop_assert_eq!(trie.lookup(k).unwrap(), Some(v));
        }
    }

    /// Property 2: after a successful delete, the key is absent and a
    /// repeat delete fails with `KeyNotFound`.
    #[test]
    fn delete_removes_and_rejects_repeat(entries in prop::collection::vec((arb_key(), arb_value()), 1..40)) {
        let mut trie = VerkleTrie::new(MemoryDb::new(), 4, 12);
        let mut keys = Vec::new();
        for (k, v) in &entries {
            trie.update(*k, *v).unwrap();
            keys.push(*k);
        }
        let target = keys[0];
        trie.delete(target).unwrap();
        prop_assert_eq!(trie.lookup(target).unwrap(), None);
        prop_assert!(matches!(trie.delete(target), Err(TrieError::KeyNotFound)));
    }

    /// Property 3: building the same multiset of (k,v) pairs via `update`
    /// in two different orders yields the same root commitment.
    #[test]
    fn root_stable_under_permutation(
        entries in prop::collection::hash_map(arb_key(), arb_value(), 1..30),
        seed in any::<u64>(),
    ) {
        let pairs: Vec<(Key, Value)> = entries.into_iter().collect();

        let mut trie_a = VerkleTrie::new(MemoryDb::new(), 4, 21);
        for &(k, v) in &pairs {
            trie_a.update(k, v).unwrap();
        }

        let mut permuted = pairs.clone();
        // Deterministic, pure-arithmetic shuffle so this stays reproducible
        // without pulling a live RNG into proptest's shrinking loop.
        let n = permuted.len();
        for i in (1..n).rev() {
            let j = (seed.wrapping_add(i as u64).wrapping_mul(2654435761)) as usize % (i + 1);
            permuted.swap(i, j);
        }
        let mut trie_b = VerkleTrie::with_scheme(MemoryDb::new(), trie_a.scheme(), 4);
        for &(k, v) in &permuted {
            trie_b.update(k, v).unwrap();
        }

        prop_assert_eq!(
            trie_a.root_commitment().unwrap().serialize(),
            trie_b.root_commitment().unwrap().serialize()
        );
    }

    /// Property 7: every index `indices(key, width_bits)` produces lies in
    /// `[0, WIDTH)`.
    #[test]
    fn indices_stay_in_range(key in arb_key(), width_bits in prop::sample::select(vec![2u8, 4, 6, 8, 10, 12])) {
        let width = 1usize << width_bits;
        for idx in indices(&key, width_bits) {
            prop_assert!(idx < width);
        }
    }
}
