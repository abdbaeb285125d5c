//! IPA utilities (C3): the Pedersen vector commitment over a fixed basis
//! `(G, Q)`, transcript hashing to a field element, and the inner-product
//! argument prover/verifier used for single-point polynomial evaluation.
//!
//! Named after the interface §6 operations it exposes (`pedersen_commit`,
//! `pedersen_commit_sparse`, `hash_to_field`,
//! `evaluate_and_compute_ipa_proof`, `check_ipa_proof`), implemented as a
//! standard logarithmic (Bulletproofs-style) inner-product argument: prove
//! knowledge of `a` such that `C = <a, G>` and `<a, b> = y` for a public
//! vector `b` (the Lagrange basis evaluated at the opening point), without
//! revealing `a`.

use std::collections::BTreeMap;

use ark_ff::{BigInteger, Field, One, PrimeField, Zero};
use sha2::{Digest, Sha256};

use crate::curve::Point;
use crate::field::{Domain, Scalar};

/// The shared Pedersen basis, auxiliary point, and evaluation domain. One
/// instance is constructed per trie and shared (by reference) between the
/// trie, its proofs, and any independent verifier — spec §9 calls this out
/// as a process-wide immutable constant for the lifetime of a trie
/// instance.
#[derive(Debug)]
pub struct CommitmentScheme {
    pub g: Vec<Point>,
    pub q: Point,
    pub domain: Domain,
}

impl CommitmentScheme {
    /// Builds a basis of `width` points plus `Q`, using `seed` to drive a
    /// deterministic RNG. Spec §1 lists reproducible basis derivation
    /// (hash-to-curve) as a non-goal: any basis works so long as prover
    /// and verifier share the same one, so a seeded placeholder RNG is
    /// sufficient — the seed just needs to be fixed for a given trie's
    /// lifetime, not derived from anything meaningful.
    pub fn new(width: usize, seed: u64) -> Self {
        use rand_core::SeedableRng;
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&seed.to_le_bytes());
        let mut rng = rand_chacha::ChaChaRng::from_seed(bytes);
        let g = (0..width)
            .map(|_| Point::random_basis_point(&mut rng))
            .collect();
        let q = Point::random_basis_point(&mut rng);
        CommitmentScheme {
            g,
            q,
            domain: Domain::new(width),
        }
    }

    pub fn width(&self) -> usize {
        self.g.len()
    }

    /// `Com(v) = sum_i v[i] * G[i]`.
    pub fn pedersen_commit(&self, v: &[Scalar]) -> Point {
        Point::msm(&self.g[..v.len()], v)
    }

    /// Same, but for a vector given as a sparse map of populated indices
    /// (spec §4.6: inner-node child vectors are zero except at the
    /// occupied indices).
    pub fn pedersen_commit_sparse(&self, entries: &BTreeMap<usize, Scalar>) -> Point {
        entries
            .iter()
            .fold(Point::zero(), |acc, (&i, &s)| acc.add(&self.g[i].mul(s)))
    }

    /// Hashes an arbitrary list of byte strings (serialized commitments,
    /// indices, evaluations, ...) to a field element. Used both by the
    /// multiproof's Fiat-Shamir transcript and by this module's own IPA
    /// round challenges.
    pub fn hash_to_field(items: &[&[u8]]) -> Scalar {
        let mut hasher = Sha256::new();
        for item in items {
            hasher.update(item);
        }
        let digest = hasher.finalize();
        Scalar::from_le_bytes_mod_order(&digest)
    }

    /// Evaluates the barycentric Lagrange basis `L_0(t), ..., L_{n-1}(t)`
    /// at `t`. If `t` coincides with a domain point, returns the
    /// corresponding unit vector rather than dividing by zero.
    fn lagrange_basis_at(&self, t: Scalar) -> Vec<Scalar> {
        let n = self.domain.width();
        for i in 0..n {
            if self.domain[i] == t {
                let mut b = vec![Scalar::zero(); n];
                b[i] = Scalar::one();
                return b;
            }
        }
        let master_at_t: Scalar = self.domain.as_slice().iter().map(|&d| t - d).product();
        (0..n)
            .map(|i| {
                let denom: Scalar = (0..n)
                    .filter(|&j| j != i)
                    .map(|j| self.domain[i] - self.domain[j])
                    .product();
                let t_minus_di = t - self.domain[i];
                master_at_t * (t_minus_di * denom).inverse().expect("t is not a domain point")
            })
            .collect()
    }

    /// Commits to `f` (in evaluation form over `self.domain`), evaluates it
    /// at `t`, and produces an IPA proof of that evaluation. Returns
    /// `(y, proof)` where `y = f(t)`.
    pub fn evaluate_and_compute_ipa_proof(
        &self,
        commitment: Point,
        f: &[Scalar],
        t: Scalar,
    ) -> (Scalar, IpaProof) {
        let b = self.lagrange_basis_at(t);
        let y = inner_product(f, &b);
        let proof = self.ipa_prove(f.to_vec(), b, commitment, y);
        (y, proof)
    }

    fn ipa_prove(&self, mut a: Vec<Scalar>, mut b: Vec<Scalar>, commitment: Point, y: Scalar) -> IpaProof {
        let mut g = self.g[..a.len()].to_vec();
        let mut l_vec = Vec::new();
        let mut r_vec = Vec::new();
        let mut transcript_seed = commitment.serialize();
        let y_seed = scalar_to_bytes(y);

        while a.len() > 1 {
            let half = a.len() / 2;
            let (a_l, a_r) = a.split_at(half);
            let (b_l, b_r) = b.split_at(half);
            let (g_l, g_r) = g.split_at(half);

            let z_l = inner_product(a_l, b_r);
            let z_r = inner_product(a_r, b_l);
            let c_l = Point::msm(g_r, a_l).add(&self.q.mul(z_l));
            let c_r = Point::msm(g_l, a_r).add(&self.q.mul(z_r));

            let x = Self::hash_to_field(&[&transcript_seed, &y_seed, &c_l.serialize(), &c_r.serialize()]);
            let x_inv = x.inverse().expect("challenge is never zero with overwhelming probability");

            let new_a: Vec<Scalar> = a_l.iter().zip(a_r.iter()).map(|(&al, &ar)| al + x * ar).collect();
            let new_b: Vec<Scalar> = b_l.iter().zip(b_r.iter()).map(|(&bl, &br)| bl + x_inv * br).collect();
            let new_g: Vec<Point> = g_l.iter().zip(g_r.iter()).map(|(&gl, &gr)| gl.add(&gr.mul(x_inv))).collect();

            transcript_seed = c_l.serialize();
            l_vec.push(c_l);
            r_vec.push(c_r);
            a = new_a;
            b = new_b;
            g = new_g;
        }

        IpaProof {
            l_vec,
            r_vec,
            a_final: a[0],
        }
    }

    /// Verifies an IPA proof that the polynomial committed to by
    /// `commitment` evaluates to `y` at `t`.
    pub fn check_ipa_proof(&self, commitment: Point, t: Scalar, y: Scalar, proof: &IpaProof) -> bool {
        let mut b = self.lagrange_basis_at(t);
        let mut g = self.g[..b.len()].to_vec();
        let mut p = commitment.add(&self.q.mul(y));

        if proof.l_vec.len() != proof.r_vec.len() {
            return false;
        }

        let mut transcript_seed = commitment.serialize();
        let y_seed = scalar_to_bytes(y);

        for (c_l, c_r) in proof.l_vec.iter().zip(proof.r_vec.iter()) {
            if g.len() <= 1 {
                return false;
            }
            let x = Self::hash_to_field(&[&transcript_seed, &y_seed, &c_l.serialize(), &c_r.serialize()]);
            let x_inv = match x.inverse() {
                Some(v) => v,
                None => return false,
            };

            p = p.add(&c_l.mul(x_inv)).add(&c_r.mul(x));

            let half = g.len() / 2;
            let (g_l, g_r) = g.split_at(half);
            let new_g: Vec<Point> = g_l.iter().zip(g_r.iter()).map(|(&gl, &gr)| gl.add(&gr.mul(x_inv))).collect();
            let (b_l, b_r) = b.split_at(half);
            let new_b: Vec<Scalar> = b_l.iter().zip(b_r.iter()).map(|(&bl, &br)| bl + x_inv * br).collect();

            transcript_seed = c_l.serialize();
            g = new_g;
            b = new_b;
        }

        if g.len() != 1 || b.len() != 1 {
            return false;
        }

        let expected = g[0].mul(proof.a_final).add(&self.q.mul(proof.a_final * b[0]));
        p == expected
    }
}

fn inner_product(a: &[Scalar], b: &[Scalar]) -> Scalar {
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).fold(Scalar::zero(), |acc, v| acc + v)
}

fn scalar_to_bytes(s: Scalar) -> [u8; 32] {
    use ark_ff::PrimeField;
    let mut bytes = [0u8; 32];
    let repr = s.into_repr();
    let be = repr.to_bytes_be();
    // `to_bytes_be` may be shorter than 32 bytes for small values; right-align.
    let start = 32 - be.len();
    bytes[start..].copy_from_slice(&be);
    bytes
}

/// A logarithmic-size proof that a committed polynomial evaluates to a
/// claimed value at a claimed point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpaProof {
    pub l_vec: Vec<Point>,
    pub r_vec: Vec<Point>,
    pub a_final: Scalar,
}
