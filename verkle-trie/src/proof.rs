//! Multiproof engine (C7): key-to-commitment-path extraction, and the IPA
//! multi-opening prover/verifier that lets a verifier holding only the root
//! commitment check many `(key, value)` memberships against one succinct
//! proof.
//!
//! Openings are keyed by `(path_id, index)` in a `BTreeMap` throughout, so
//! both the `r^j` transcript exponents and the distinct `Cs_sorted`
//! commitment list fall out of one canonical, order-independent iteration
//! rather than depending on the order callers pass keys in. Built from the
//! IPA and field primitives in [`crate::ipa`] and [`crate::field`],
//! generalized to the variable-width, variable-depth case this trie
//! supports rather than a fixed two-level layout.

use std::collections::{BTreeMap, BTreeSet};

use ark_ff::{Field, One, Zero};

use verkle_db::NodeStore;

use crate::curve::{self, Point};
use crate::error::{Result, TrieError};
use crate::field::{self, Scalar};
use crate::ipa::{CommitmentScheme, IpaProof};
use crate::node::{self, Key, Node, PathId, Value};
use crate::trie::{indices, VerkleTrie};

/// A succinct multi-key membership proof (spec §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiProof {
    /// Per-key path length (number of indices consumed to reach its leaf),
    /// in the same order as the keys the proof was requested for.
    pub depths: Vec<u8>,
    /// The distinct non-root commitments touched by the traversal, sorted
    /// by their path identifier — the canonical order prover and verifier
    /// agree on without exchanging path identifiers directly.
    pub commitments_sorted: Vec<Point>,
    pub d: Point,
    pub ipa_proof: IpaProof,
}

struct NodeInfo {
    commitment: Point,
    /// Full width-sized evaluation vector: child hashes for an inner node,
    /// `(1, key, value_lo, value_hi, 0, ...)` for a leaf.
    f: Vec<Scalar>,
}

impl<S: NodeStore> VerkleTrie<S> {
    /// Builds a multiproof that every key in `keys` currently maps to the
    /// value this trie holds for it, returning those values alongside the
    /// proof. Fails with `KeyNotFound` if any key is absent — spec §4.9
    /// lists "proof of absent key" as a failure, not a supported
    /// non-membership mode.
    pub fn prove(&self, keys: &[Key]) -> Result<(Vec<Value>, MultiProof)> {
        let mut nodes: BTreeMap<PathId, NodeInfo> = BTreeMap::new();
        let mut openings: BTreeMap<(PathId, usize), Scalar> = BTreeMap::new();
        let mut depths = Vec::with_capacity(keys.len());
        let mut values = Vec::with_capacity(keys.len());

        for &key in keys {
            let (depth, value) = self.extract_for_key(key, &mut nodes, &mut openings)?;
            depths.push(depth);
            values.push(value);
        }

        let width = self.width();
        let scheme = self.scheme();
        let domain = &scheme.domain;

        let mut distinct_path_ids = Vec::new();
        let mut cs = Vec::with_capacity(openings.len());
        let mut fs = Vec::with_capacity(openings.len());
        let mut idxs_used = Vec::with_capacity(openings.len());
        let mut ys = Vec::with_capacity(openings.len());

        for (&(path_id, index), &y) in &openings {
            if distinct_path_ids.last() != Some(&path_id) {
                distinct_path_ids.push(path_id);
            }
            let info = &nodes[&path_id];
            cs.push(info.commitment);
            fs.push(info.f.clone());
            idxs_used.push(index);
            ys.push(y);
        }

        // The root's commitment is supplied separately to `verify` (as
        // `root_commitment`), so `Cs_sorted` only ever lists the distinct
        // *non-root* commitments touched by the traversal — matching
        // `verify`'s reconstruction, which never inserts the root into
        // `path_ids_needed` either.
        let root_id = self.root_id();
        distinct_path_ids.retain(|id| *id != root_id);
        let commitments_sorted: Vec<Point> = distinct_path_ids.iter().map(|id| nodes[id].commitment).collect();

        let r = transcript_r(&cs, &idxs_used, &ys);

        let mut g_evals = vec![Scalar::zero(); width];
        let mut r_pow = Scalar::one();
        for j in 0..cs.len() {
            let q = field::compute_inner_quotient_in_evaluation_form(&fs[j], idxs_used[j], domain);
            for k in 0..width {
                g_evals[k] += r_pow * q[k];
            }
            r_pow *= r;
        }
        let d = scheme.pedersen_commit(&g_evals);

        let t = CommitmentScheme::hash_to_field(&[&field::to_le_bytes(r), &d.serialize()]);

        let mut h_evals = vec![Scalar::zero(); width];
        r_pow = Scalar::one();
        for j in 0..cs.len() {
            let denom = t - domain[idxs_used[j]];
            let c_j = r_pow
                * denom
                    .inverse()
                    .ok_or_else(|| TrieError::ProofInvalid)?;
            for k in 0..width {
                h_evals[k] += c_j * fs[j][k];
            }
            r_pow *= r;
        }
        let e = scheme.pedersen_commit(&h_evals);

        let hg_evals: Vec<Scalar> = h_evals.iter().zip(g_evals.iter()).map(|(&h, &g)| h - g).collect();
        let e_minus_d = e.add(&d.mul(-Scalar::one()));
        let (_, ipa_proof) = scheme.evaluate_and_compute_ipa_proof(e_minus_d, &hg_evals, t);

        Ok((
            values,
            MultiProof {
                depths,
                commitments_sorted,
                d,
                ipa_proof,
            },
        ))
    }

    fn extract_for_key(
        &self,
        key: Key,
        nodes: &mut BTreeMap<PathId, NodeInfo>,
        openings: &mut BTreeMap<(PathId, usize), Scalar>,
    ) -> Result<(u8, Value)> {
        let idxs = self.indices_for(&key);
        let width = self.width();
        let mut current_id = self.root_id();
        let mut depth = 0usize;

        loop {
            let inner = self.load_inner_checked(current_id)?;
            if !nodes.contains_key(&current_id) {
                let mut f = vec![Scalar::zero(); width];
                for (&child_index, &child_id) in &inner.children {
                    let child_hash = self.load_any(child_id)?.hash();
                    f[child_index] = child_hash;
                }
                nodes.insert(current_id, NodeInfo { commitment: inner.commitment, f });
            }

            let i = idxs[depth];
            let child_id = *inner.children.get(&i).ok_or(TrieError::KeyNotFound)?;
            let child_hash = nodes[&current_id].f[i];
            openings.entry((current_id, i)).or_insert(child_hash);

            match self.load_any(child_id)? {
                Node::Inner(_) => {
                    current_id = child_id;
                    depth += 1;
                    continue;
                }
                Node::Leaf(leaf) => {
                    if leaf.key != key {
                        return Err(TrieError::KeyNotFound);
                    }
                    if !nodes.contains_key(&child_id) {
                        let mut f = vec![Scalar::zero(); width];
                        f[0] = Scalar::one();
                        f[1] = field::from_le_bytes_mod_order(&leaf.key);
                        f[2] = field::from_le_bytes_mod_order(&leaf.value[0..16]);
                        f[3] = field::from_le_bytes_mod_order(&leaf.value[16..32]);
                        nodes.insert(child_id, NodeInfo { commitment: leaf.commitment, f });
                    }
                    for idx in 0..4 {
                        let y = nodes[&child_id].f[idx];
                        openings.entry((child_id, idx)).or_insert(y);
                    }
                    return Ok(((depth + 1) as u8, leaf.value));
                }
            }
        }
    }
}

/// Verifies a multiproof against `root_commitment` for the claimed
/// `(keys, values)` pairs. Mirrors `prove`'s five verifying steps without
/// ever touching a node store: every quantity is reconstructed from the
/// claim itself plus the proof's `depths`/`commitments_sorted`.
pub fn verify(
    scheme: &CommitmentScheme,
    width_bits: u8,
    root_commitment: Point,
    keys: &[Key],
    values: &[Value],
    proof: &MultiProof,
) -> Result<bool> {
    if keys.len() != values.len() || keys.len() != proof.depths.len() {
        return Err(TrieError::ProofMalformed(
            "keys, values, and depths must have equal length".to_string(),
        ));
    }

    enum Kind {
        Edge { child_path_id: PathId },
        Leaf { y: Scalar },
    }

    let mut path_ids_needed: BTreeSet<PathId> = BTreeSet::new();
    let mut openings: BTreeMap<(PathId, usize), Kind> = BTreeMap::new();

    for ((&key, &value), &depth) in keys.iter().zip(values.iter()).zip(proof.depths.iter()) {
        let idxs = indices(&key, width_bits);
        let depth = depth as usize;
        if depth == 0 || depth > idxs.len() {
            return Err(TrieError::ProofMalformed("depth out of range for key".to_string()));
        }
        for level in 0..depth {
            let parent_path_id = node::path_id(&idxs[..level]);
            let child_path_id = node::path_id(&idxs[..=level]);
            path_ids_needed.insert(child_path_id);
            openings
                .entry((parent_path_id, idxs[level]))
                .or_insert(Kind::Edge { child_path_id });
        }
        let leaf_path_id = node::path_id(&idxs[..depth]);
        let claims = [
            Scalar::one(),
            field::from_le_bytes_mod_order(&key),
            field::from_le_bytes_mod_order(&value[0..16]),
            field::from_le_bytes_mod_order(&value[16..32]),
        ];
        for (idx, &y) in claims.iter().enumerate() {
            openings.entry((leaf_path_id, idx)).or_insert(Kind::Leaf { y });
        }
    }

    if path_ids_needed.len() != proof.commitments_sorted.len() {
        return Err(TrieError::ProofMalformed(
            "commitment list length does not match reconstructed traversal".to_string(),
        ));
    }
    let commitment_by_path: BTreeMap<PathId, Point> = path_ids_needed
        .into_iter()
        .zip(proof.commitments_sorted.iter().copied())
        .collect();

    let root_id = node::root_path_id();
    let lookup_commitment = |id: PathId| -> Result<Point> {
        if id == root_id {
            Ok(root_commitment)
        } else {
            commitment_by_path
                .get(&id)
                .copied()
                .ok_or_else(|| TrieError::ProofMalformed("referenced commitment not supplied".to_string()))
        }
    };

    let mut cs = Vec::with_capacity(openings.len());
    let mut idxs_used = Vec::with_capacity(openings.len());
    let mut ys = Vec::with_capacity(openings.len());
    for (&(path_id, index), kind) in &openings {
        let commitment = lookup_commitment(path_id)?;
        let y = match kind {
            Kind::Edge { child_path_id } => curve::group_to_field(&lookup_commitment(*child_path_id)?),
            Kind::Leaf { y } => *y,
        };
        cs.push(commitment);
        idxs_used.push(index);
        ys.push(y);
    }

    let r = transcript_r(&cs, &idxs_used, &ys);
    let t = CommitmentScheme::hash_to_field(&[&field::to_le_bytes(r), &proof.d.serialize()]);

    let mut g2 = Scalar::zero();
    let mut e = Point::zero();
    let mut r_pow = Scalar::one();
    for j in 0..cs.len() {
        let denom = t - scheme.domain[idxs_used[j]];
        let e_j = match denom.inverse() {
            Some(inv) => r_pow * inv,
            None => return Ok(false),
        };
        g2 += e_j * ys[j];
        e = e.add(&cs[j].mul(e_j));
        r_pow *= r;
    }

    let e_minus_d = e.add(&proof.d.mul(-Scalar::one()));
    Ok(scheme.check_ipa_proof(e_minus_d, t, g2, &proof.ipa_proof))
}

fn transcript_r(cs: &[Point], indices: &[usize], ys: &[Scalar]) -> Scalar {
    let mut bytes: Vec<Vec<u8>> = Vec::with_capacity(cs.len() * 3);
    for c in cs {
        bytes.push(c.serialize().to_vec());
    }
    for &i in indices {
        bytes.push((i as u64).to_le_bytes().to_vec());
    }
    for &y in ys {
        bytes.push(field::to_le_bytes(y).to_vec());
    }
    let refs: Vec<&[u8]> = bytes.iter().map(|v| v.as_slice()).collect();
    CommitmentScheme::hash_to_field(&refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verkle_db::MemoryDb;

    fn key_from_u64(v: u64) -> Key {
        let mut k = [0u8; 32];
        k[24..].copy_from_slice(&v.to_be_bytes());
        k
    }

    fn value_from_u64(v: u64) -> Value {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&v.to_be_bytes());
        out
    }

    fn build_trie(width_bits: u8, n: u64, seed: u64) -> VerkleTrie<MemoryDb> {
        let mut trie = VerkleTrie::new(MemoryDb::new(), width_bits, seed);
        for i in 0..n {
            trie.update(key_from_u64(i), value_from_u64(i + 1000)).unwrap();
        }
        trie
    }

    #[test]
    fn single_key_proof_round_trips() {
        let trie = build_trie(4, 50, 1);
        let key = key_from_u64(7);
        let (values, proof) = trie.prove(&[key]).unwrap();
        assert_eq!(values, vec![value_from_u64(1007)]);
        let ok = verify(&trie.scheme(), 4, trie.root_commitment().unwrap(), &[key], &values, &proof).unwrap();
        assert!(ok);
    }

    #[test]
    fn multi_key_proof_round_trips_and_is_order_independent() {
        let trie = build_trie(8, 200, 2);
        let keys = vec![key_from_u64(2), key_from_u64(7), key_from_u64(199)];
        let (values, proof) = trie.prove(&keys).unwrap();
        let root = trie.root_commitment().unwrap();
        assert!(verify(&trie.scheme(), 8, root, &keys, &values, &proof).unwrap());

        let mut reordered_keys = keys.clone();
        let mut reordered_values = values.clone();
        reordered_keys.swap(0, 2);
        reordered_values.swap(0, 2);
        let (_, proof_reordered) = trie.prove(&reordered_keys).unwrap();
        assert!(verify(&trie.scheme(), 8, root, &reordered_keys, &reordered_values, &proof_reordered).unwrap());
    }

    #[test]
    fn tampering_with_value_is_rejected() {
        let trie = build_trie(4, 50, 3);
        let key = key_from_u64(10);
        let (mut values, proof) = trie.prove(&[key]).unwrap();
        values[0] = value_from_u64(999999);
        let root = trie.root_commitment().unwrap();
        assert!(!verify(&trie.scheme(), 4, root, &[key], &values, &proof).unwrap());
    }

    #[test]
    fn tampering_with_proof_byte_is_rejected() {
        let trie = build_trie(4, 50, 4);
        let key = key_from_u64(10);
        let (values, mut proof) = trie.prove(&[key]).unwrap();
        proof.ipa_proof.a_final += Scalar::one();
        let root = trie.root_commitment().unwrap();
        assert!(!verify(&trie.scheme(), 4, root, &[key], &values, &proof).unwrap());
    }

    #[test]
    fn proving_absent_key_fails() {
        let trie = build_trie(4, 10, 5);
        assert!(matches!(trie.prove(&[key_from_u64(999)]), Err(TrieError::KeyNotFound)));
    }

    #[test]
    fn update_then_proof_reflects_new_value() {
        let mut trie = build_trie(4, 20, 6);
        let key = key_from_u64(3);
        trie.update(key, value_from_u64(42)).unwrap();
        let (values, proof) = trie.prove(&[key]).unwrap();
        assert_eq!(values[0], value_from_u64(42));
        let root = trie.root_commitment().unwrap();
        assert!(verify(&trie.scheme(), 4, root, &[key], &values, &proof).unwrap());
        assert!(!verify(&trie.scheme(), 4, root, &[key], &[value_from_u64(41)], &proof).unwrap());
    }
}
