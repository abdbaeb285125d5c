//! An authenticated key/value store indexed by fixed-width keys, backed by
//! a Verkle trie: internal nodes commit to their children with a Pedersen
//! vector commitment, and membership of a batch of keys can be proved
//! succinctly with a single polynomial multi-opening argument (IPA).
//!
//! Module map mirrors the component layering the algorithms build on, leaf
//! (field/curve primitives) first:
//! - [`field`] — scalar-field arithmetic and Lagrange/barycentric evaluation.
//! - [`curve`] — elliptic curve points and commitment helpers.
//! - [`ipa`] — Pedersen vector commitments and the inner-product argument.
//! - [`node`] — on-disk node representation and path-identifier derivation.
//! - [`trie`] — index derivation, insert/update/delete, lookup.
//! - [`proof`] — the IPA multiproof prover and verifier.
//! - [`diagnostics`] — depth statistics and structural validation.
//! - [`config`] — trie configuration and the store-opening entry point.
//! - [`authenticated`] — a trait façade over mutation + proof operations.
//! - [`error`] — the error type every fallible operation returns.

pub mod authenticated;
pub mod config;
pub mod curve;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod ipa;
pub mod node;
pub mod proof;
pub mod trie;

pub use authenticated::AuthenticatedTrie;
pub use config::TrieConfig;
pub use error::{Result, TrieError};
pub use ipa::CommitmentScheme;
pub use node::{Key, Value};
pub use proof::MultiProof;
pub use trie::VerkleTrie;
