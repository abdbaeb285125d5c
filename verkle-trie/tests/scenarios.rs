//! Deterministic end-to-end scenarios (spec §8, S1–S6), each seeded for
//! reproducibility.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

use verkle_db::MemoryDb;
use verkle_trie::ipa::CommitmentScheme;
use verkle_trie::node::{Key, Value};
use verkle_trie::{TrieError, VerkleTrie};

fn le_key(i: u64) -> Key {
    let mut k = [0u8; 32];
    k[..8].copy_from_slice(&i.to_le_bytes());
    k
}

fn le_value(i: u64) -> Value {
    let mut v = [0u8; 32];
    v[..8].copy_from_slice(&i.to_le_bytes());
    v
}

/// S1: width_bits=8, insert keys `LE(i)` for i=0..9 with value `LE(i+1000)`.
#[test]
fn s1_small_insert_lookup_and_proof() {
    let mut trie = VerkleTrie::new(MemoryDb::new(), 8, 100);
    for i in 0..10u64 {
        trie.update(le_key(i), le_value(i + 1000)).unwrap();
    }

    assert_eq!(trie.lookup(le_key(5)).unwrap(), Some(le_value(1005)));
    assert!(trie.check_valid_tree().is_ok());

    let keys = vec![le_key(2), le_key(7)];
    let (values, proof) = trie.prove(&keys).unwrap();
    let root = trie.root_commitment().unwrap();
    assert!(verkle_trie::proof::verify(&trie.scheme(), 8, root, &keys, &values, &proof).unwrap());

    let mut tampered = proof.clone();
    let byte = &mut tampered.ipa_proof.l_vec[0];
    *byte = byte.add(byte); // corrupt the first transcript commitment deterministically
    assert!(!verkle_trie::proof::verify(&trie.scheme(), 8, root, &keys, &values, &tampered).unwrap());
}

/// S2: width_bits=4, insert 1024 random keys in two different orders;
/// assert both roots have equal serialized commitment.
#[test]
fn s2_root_stable_under_permutation() {
    let mut rng = ChaChaRng::seed_from_u64(2);
    let entries: Vec<(Key, Value)> = (0..1024u64)
        .map(|_| {
            let mut k = [0u8; 32];
            rng.fill(&mut k);
            let mut v = [0u8; 32];
            rng.fill(&mut v);
            (k, v)
        })
        .collect();

    let scheme = Arc::new(CommitmentScheme::new(16, 7));

    let mut order_a = entries.clone();
    let mut trie_a = VerkleTrie::with_scheme(MemoryDb::new(), scheme.clone(), 4);
    for &(k, v) in &order_a {
        trie_a.update(k, v).unwrap();
    }

    order_a.shuffle(&mut rng);
    let mut trie_b = VerkleTrie::with_scheme(MemoryDb::new(), scheme, 4);
    for &(k, v) in &order_a {
        trie_b.update(k, v).unwrap();
    }

    assert_eq!(
        trie_a.root_commitment().unwrap().serialize(),
        trie_b.root_commitment().unwrap().serialize()
    );
}

/// S3: width_bits=8, insert 1024 keys, delete a random 256 of them; the
/// remaining 768 resolve, no deleted key does, and the tree stays valid.
#[test]
fn s3_bulk_delete_leaves_consistent_tree() {
    let mut rng = ChaChaRng::seed_from_u64(3);
    let mut trie = VerkleTrie::new(MemoryDb::new(), 8, 30);
    let entries: Vec<(Key, Value)> = (0..1024u64)
        .map(|i| {
            let mut v = [0u8; 32];
            rng.fill(&mut v);
            (le_key(i), v)
        })
        .collect();
    for &(k, v) in &entries {
        trie.update(k, v).unwrap();
    }

    let mut indices: Vec<usize> = (0..entries.len()).collect();
    indices.shuffle(&mut rng);
    let (deleted, kept): (Vec<usize>, Vec<usize>) = indices.into_iter().enumerate().fold(
        (Vec::new(), Vec::new()),
        |(mut d, mut k), (n, idx)| {
            if n < 256 {
                d.push(idx);
            } else {
                k.push(idx);
            }
            (d, k)
        },
    );

    for &idx in &deleted {
        trie.delete(entries[idx].0).unwrap();
    }

    for &idx in &kept {
        assert_eq!(trie.lookup(entries[idx].0).unwrap(), Some(entries[idx].1));
    }
    for &idx in &deleted {
        assert_eq!(trie.lookup(entries[idx].0).unwrap(), None);
    }
    assert!(trie.check_valid_tree().is_ok());
}

/// S4: single-key trie; delete it; root collapses to an empty inner node.
#[test]
fn s4_single_key_delete_yields_empty_root() {
    let mut trie = VerkleTrie::new(MemoryDb::new(), 8, 40);
    let key = le_key(1);
    trie.update(key, le_value(1)).unwrap();
    trie.delete(key).unwrap();

    assert_eq!(trie.root_commitment().unwrap(), verkle_trie::curve::Point::zero());
    assert_eq!(trie.lookup(key).unwrap(), None);
    assert!(matches!(trie.delete(key), Err(TrieError::KeyNotFound)));
}

/// S6: mutate a key after snapshotting its old value, then assert a proof
/// verifies against the new value and fails against the stale one.
#[test]
fn s6_mutation_then_proof_consistency() {
    let mut trie = VerkleTrie::new(MemoryDb::new(), 8, 60);
    let key = le_key(42);
    trie.update(key, le_value(1)).unwrap();

    trie.update(key, le_value(2)).unwrap();
    let (values, proof) = trie.prove(&[key]).unwrap();
    let root = trie.root_commitment().unwrap();

    assert!(verkle_trie::proof::verify(&trie.scheme(), 8, root, &[key], &values, &proof).unwrap());
    assert!(!verkle_trie::proof::verify(&trie.scheme(), 8, root, &[key], &[le_value(1)], &proof).unwrap());
}
