//! Curve / commitment primitives (C2): elliptic curve points with
//! addition, scalar multiplication, multi-scalar multiplication, and
//! (de)serialization. Wraps `bandersnatch::EdwardsProjective`
//! (`ProjectiveCurve::mul`, `CanonicalSerialize::serialize`) behind a
//! named type so the rest of the crate doesn't depend on
//! `ark_ec`/`bandersnatch` import paths directly.

use ark_ec::ProjectiveCurve;
use ark_ff::{PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use bandersnatch::{EdwardsProjective, Fr};

use crate::field::Scalar;

/// A point on the Bandersnatch curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point(pub(crate) EdwardsProjective);

impl Point {
    /// The identity element (commitment of the all-zero vector).
    pub fn zero() -> Self {
        Point(EdwardsProjective::zero())
    }

    /// A basis point. `generator=false` draws from a process-wide
    /// placeholder random basis rather than a reproducibly-hashed one —
    /// spec §1 names reproducible basis derivation as a non-goal, so
    /// prover and verifier only need to agree on *a* basis, not on how it
    /// was derived.
    pub fn random_basis_point<R: rand_core::RngCore>(rng: &mut R) -> Self {
        use ark_ff::UniformRand;
        Point(EdwardsProjective::rand(rng))
    }

    pub fn add(&self, other: &Point) -> Point {
        Point(self.0 + other.0)
    }

    pub fn dup(&self) -> Point {
        *self
    }

    pub fn mul(&self, scalar: Scalar) -> Point {
        Point(self.0.mul(scalar.into_repr()))
    }

    /// Multi-scalar multiplication: `sum_i points[i] * scalars[i]`. Not
    /// optimized (no Pippenger bucketing) — correctness over speed, since
    /// this crate's budget goes to the trie/proof algorithms, not MSM
    /// performance.
    pub fn msm(points: &[Point], scalars: &[Scalar]) -> Point {
        assert_eq!(points.len(), scalars.len());
        points
            .iter()
            .zip(scalars.iter())
            .fold(Point::zero(), |acc, (p, s)| acc.add(&p.mul(*s)))
    }

    pub fn serialize(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.0
            .serialize(&mut bytes[..])
            .expect("EdwardsProjective serializes to exactly 32 bytes");
        bytes
    }

    pub fn deserialize(bytes: &[u8; 32]) -> Option<Point> {
        EdwardsProjective::deserialize(&bytes[..]).ok().map(Point)
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point(self.0 + rhs.0)
    }
}

/// Reduces a point's little-endian serialization mod the scalar field's
/// modulus, producing the node `hash` spec §3 defines
/// (`hash = LE(commitment) mod MODULUS`).
pub fn group_to_field(p: &Point) -> Fr {
    Fr::from_le_bytes_mod_order(&p.serialize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_additive_identity() {
        let mut rng = rand_chacha::ChaChaRng::from_seed_helper(1);
        let p = Point::random_basis_point(&mut rng);
        assert_eq!(p.add(&Point::zero()), p);
    }

    #[test]
    fn msm_matches_manual_sum() {
        let mut rng = rand_chacha::ChaChaRng::from_seed_helper(2);
        let points = vec![
            Point::random_basis_point(&mut rng),
            Point::random_basis_point(&mut rng),
        ];
        let scalars = vec![Scalar::from(3u64), Scalar::from(5u64)];
        let manual = points[0].mul(scalars[0]).add(&points[1].mul(scalars[1]));
        assert_eq!(Point::msm(&points, &scalars), manual);
    }

    // Small seeding helper so tests don't depend on a particular
    // `rand_chacha` constructor signature across versions.
    trait FromSeedHelper {
        fn from_seed_helper(seed: u64) -> Self;
    }
    impl FromSeedHelper for rand_chacha::ChaChaRng {
        fn from_seed_helper(seed: u64) -> Self {
            use rand_core::SeedableRng;
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&seed.to_le_bytes());
            rand_chacha::ChaChaRng::from_seed(bytes)
        }
    }
}
