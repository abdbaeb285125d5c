//! Authenticated-store façade (SPEC_FULL.md §10): binds mutation and proof
//! operations behind one trait, grounded on `original_source`'s abstract
//! `Trie` base class (`root_hash`/`update`/`delete`/`get_proof`/`verify`),
//! so callers that only need "authenticated key/value store" semantics
//! aren't tied to [`VerkleTrie`]'s inherent-method surface.

use verkle_db::NodeStore;

use crate::error::Result;
use crate::field::Scalar;
use crate::node::{Key, Value};
use crate::proof::{self, MultiProof};
use crate::trie::VerkleTrie;

pub trait AuthenticatedTrie {
    fn root_hash(&self) -> Result<Scalar>;
    fn update(&mut self, key: Key, value: Value) -> Result<()>;
    fn delete(&mut self, key: Key) -> Result<()>;
    fn get_proof(&self, keys: &[Key]) -> Result<(Vec<Value>, MultiProof)>;
    fn verify(&self, keys: &[Key], values: &[Value], proof: &MultiProof) -> Result<bool>;
}

impl<S: NodeStore> AuthenticatedTrie for VerkleTrie<S> {
    fn root_hash(&self) -> Result<Scalar> {
        VerkleTrie::root_hash(self)
    }

    fn update(&mut self, key: Key, value: Value) -> Result<()> {
        VerkleTrie::update(self, key, value)
    }

    fn delete(&mut self, key: Key) -> Result<()> {
        VerkleTrie::delete(self, key)
    }

    fn get_proof(&self, keys: &[Key]) -> Result<(Vec<Value>, MultiProof)> {
        self.prove(keys)
    }

    fn verify(&self, keys: &[Key], values: &[Value], proof: &MultiProof) -> Result<bool> {
        proof::verify(&self.scheme(), self.width_bits(), self.root_commitment()?, keys, values, proof)
    }
}
