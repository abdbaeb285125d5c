//! Trie algorithms (C6): index derivation, the insert-only batch build, the
//! incremental-commitment `update`, `delete` with collapse, and lookup.
//!
//! Keeps the `Ins`/`create_insert_instructions`/`process_instructions`
//! plan-then-commit shape — work out what changed, then apply it
//! bottom-up in one pass — generalized from a hardcoded 256-ary, 31-byte
//! stem layout to the variable-`WIDTH` index/commitment scheme §4
//! defines.

use std::collections::{BTreeMap, HashMap};
use std::convert::TryInto;
use std::sync::Arc;

use ark_ff::Zero;
use tracing::{debug, instrument, warn};

use verkle_db::NodeStore;

use crate::curve;
use crate::error::{Result, TrieError};
use crate::field::Scalar;
use crate::ipa::CommitmentScheme;
use crate::node::{self, InnerNode, Key, LeafNode, Node, PathId, Value};

const KEY_LENGTH_BITS: u32 = 256;

/// `indices(key) = (i_0, ..., i_{L-1})`, root-first, per spec §4.1.
///
/// The key is read as a big-endian 256-bit integer. The least-significant
/// `r = KEY_LENGTH mod WIDTH_BITS` bits form the *last* index, left-shifted
/// into the high bits of its `WIDTH_BITS`-wide slot; the rest of the key is
/// then consumed in full `WIDTH_BITS`-wide chunks from least to most
/// significant. This keeps every index in range regardless of whether
/// `WIDTH_BITS` divides 256, and guarantees two keys sharing their top
/// `k*WIDTH_BITS` bits share their first `k` indices.
pub fn indices(key: &Key, width_bits: u8) -> Vec<usize> {
    let width_bits = width_bits as u32;
    let mut x = BigKey::from_be_bytes(key);
    let r = KEY_LENGTH_BITS % width_bits;

    let mut lsb_first = Vec::new();
    if r != 0 {
        let low = x.take_low_bits(r);
        lsb_first.push((low << (width_bits - r)) as usize);
        let remaining_chunks = (KEY_LENGTH_BITS - r) / width_bits;
        for _ in 0..remaining_chunks {
            lsb_first.push(x.take_low_bits(width_bits) as usize);
        }
    } else {
        let chunks = KEY_LENGTH_BITS / width_bits;
        for _ in 0..chunks {
            lsb_first.push(x.take_low_bits(width_bits) as usize);
        }
    }

    lsb_first.reverse();
    lsb_first
}

/// A minimal fixed-width (256-bit) unsigned integer, big-endian on
/// construction, supporting only what `indices` needs: masking off and
/// shifting away a handful of low bits at a time.
struct BigKey {
    /// Little-endian 64-bit limbs: `limbs[0]` holds the least significant
    /// 64 bits.
    limbs: [u64; 4],
}

impl BigKey {
    fn from_be_bytes(bytes: &Key) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let start = 32 - 8 * (i + 1);
            *limb = u64::from_be_bytes(bytes[start..start + 8].try_into().unwrap());
        }
        BigKey { limbs }
    }

    /// Returns the low `n` bits (`n <= 63`) and shifts them out.
    fn take_low_bits(&mut self, n: u32) -> u64 {
        if n == 0 {
            return 0;
        }
        let mask = (1u64 << n) - 1;
        let value = self.limbs[0] & mask;
        for i in 0..4 {
            let carry_in = if i + 1 < 4 { self.limbs[i + 1] & mask } else { 0 };
            self.limbs[i] = (self.limbs[i] >> n) | (carry_in << (64 - n));
        }
        value
    }
}

/// An authenticated key/value store backed by a Verkle trie.
pub struct VerkleTrie<S: NodeStore> {
    store: S,
    scheme: Arc<CommitmentScheme>,
    width_bits: u8,
}

impl<S: NodeStore> VerkleTrie<S> {
    /// Opens a trie over `store` using a freshly generated basis of
    /// `2^width_bits` points. `seed` drives that basis's placeholder RNG
    /// (spec §1: reproducible basis derivation is a non-goal, so any fixed
    /// seed is acceptable as long as it doesn't change for this store's
    /// lifetime).
    pub fn new(store: S, width_bits: u8, seed: u64) -> Self {
        let width = 1usize << width_bits;
        let scheme = Arc::new(CommitmentScheme::new(width, seed));
        VerkleTrie {
            store,
            scheme,
            width_bits,
        }
    }

    /// Opens a trie sharing an existing basis — required whenever a proof
    /// produced by one trie instance will be checked independently of it.
    pub fn with_scheme(store: S, scheme: Arc<CommitmentScheme>, width_bits: u8) -> Self {
        VerkleTrie {
            store,
            scheme,
            width_bits,
        }
    }

    pub fn scheme(&self) -> Arc<CommitmentScheme> {
        self.scheme.clone()
    }

    pub fn width_bits(&self) -> u8 {
        self.width_bits
    }

    pub(crate) fn width(&self) -> usize {
        self.scheme.width()
    }

    pub(crate) fn indices_for(&self, key: &Key) -> Vec<usize> {
        indices(key, self.width_bits)
    }

    pub(crate) fn root_id(&self) -> PathId {
        node::root_path_id()
    }

    fn load_node(&self, id: PathId) -> Result<Node> {
        let bytes = self
            .store
            .get(&id)
            .map_err(TrieError::from)?
            .ok_or_else(|| TrieError::Corruption("referenced node missing from store".to_string()))?;
        Node::decode(&bytes).map_err(|e| TrieError::Corruption(format!("node decode failed: {e}")))
    }

    /// Loads the inner node at `id`, treating a missing root as a freshly
    /// initialized empty inner node rather than corruption.
    fn load_inner_or_empty_root(&self, id: PathId) -> Result<InnerNode> {
        if id == self.root_id() {
            match self.store.get(&id).map_err(TrieError::from)? {
                None => return Ok(InnerNode::empty()),
                Some(bytes) => {
                    return match Node::decode(&bytes)
                        .map_err(|e| TrieError::Corruption(format!("node decode failed: {e}")))?
                    {
                        Node::Inner(i) => Ok(i),
                        Node::Leaf(_) => Err(TrieError::Corruption("root is a leaf".to_string())),
                    };
                }
            }
        }
        match self.load_node(id)? {
            Node::Inner(i) => Ok(i),
            Node::Leaf(_) => Err(TrieError::Corruption("expected inner node".to_string())),
        }
    }

    /// The root's `hash` field element — spec §9(d)'s canonical root
    /// identifier for proofs.
    pub fn root_hash(&self) -> Result<Scalar> {
        Ok(self.load_inner_or_empty_root(self.root_id())?.hash)
    }

    pub fn root_commitment(&self) -> Result<crate::curve::Point> {
        Ok(self.load_inner_or_empty_root(self.root_id())?.commitment)
    }

    // ---- lookup (§4.5) ----------------------------------------------

    #[instrument(level = "debug", skip(self))]
    pub fn lookup(&self, key: Key) -> Result<Option<Value>> {
        let idxs = self.indices_for(&key);
        let mut current_id = self.root_id();
        for (depth, &i) in idxs.iter().enumerate() {
            let current = self.load_inner_or_empty_root(current_id)?;
            let _ = depth;
            match current.children.get(&i).copied() {
                None => return Ok(None),
                Some(child_id) => match self.load_node(child_id)? {
                    Node::Inner(_) => {
                        current_id = child_id;
                        continue;
                    }
                    Node::Leaf(leaf) => {
                        if leaf.key == key {
                            return Ok(Some(leaf.value));
                        }
                        return Ok(None);
                    }
                },
            }
        }
        Ok(None)
    }

    // ---- insert-only batch build (§4.2) -------------------------------

    /// Builds (or extends) a trie from a batch of entries without
    /// maintaining commitments as it goes; commitments and hashes are
    /// filled in afterward by a single bottom-up pass. Intended for bulk
    /// loading, where per-entry incremental recommitment would redo the
    /// same upper-level work `entries.len()` times.
    #[instrument(level = "debug", skip(self, entries))]
    pub fn insert_build(&mut self, entries: &[(Key, Value)]) -> Result<()> {
        for &(key, value) in entries {
            self.insert_only_one(key, value)?;
        }
        self.recompute_all_commitments()?;
        Ok(())
    }

    fn insert_only_one(&mut self, key: Key, value: Value) -> Result<()> {
        let idxs = self.indices_for(&key);
        let mut prefix: Vec<usize> = Vec::new();
        let mut current_id = self.root_id();
        let mut depth = 0usize;

        loop {
            let mut current = self.load_inner_or_empty_root(current_id)?;
            let i = idxs[depth];
            match current.children.get(&i).copied() {
                None => {
                    let mut leaf_path = prefix.clone();
                    leaf_path.push(i);
                    let leaf_id = node::path_id(&leaf_path);
                    self.put_placeholder_leaf(leaf_id, key, value)?;
                    current.children.insert(i, leaf_id);
                    self.store
                        .put(current_id, Node::Inner(current).encode())
                        .map_err(TrieError::from)?;
                    return Ok(());
                }
                Some(child_id) => match self.load_node(child_id)? {
                    Node::Inner(_) => {
                        prefix.push(i);
                        current_id = child_id;
                        depth += 1;
                        continue;
                    }
                    Node::Leaf(existing) => {
                        if existing.key == key {
                            self.put_placeholder_leaf(child_id, key, value)?;
                            return Ok(());
                        }
                        self.split_leaf_structural(&prefix, i, depth, existing, key, value)?;
                        return Ok(());
                    }
                },
            }
        }
    }

    fn put_placeholder_leaf(&self, id: PathId, key: Key, value: Value) -> Result<()> {
        let placeholder = LeafNode {
            key,
            value,
            commitment: crate::curve::Point::zero(),
            hash: Scalar::zero(),
        };
        self.store
            .put(id, Node::Leaf(placeholder).encode())
            .map_err(TrieError::from)
    }

    fn split_leaf_structural(
        &self,
        prefix: &[usize],
        i: usize,
        depth: usize,
        existing: LeafNode,
        new_key: Key,
        new_value: Value,
    ) -> Result<()> {
        let new_idxs = self.indices_for(&new_key);
        let old_idxs = self.indices_for(&existing.key);
        let mut base_path = prefix.to_vec();
        base_path.push(i);

        let mut k = depth + 1;
        while new_idxs[k] == old_idxs[k] {
            k += 1;
        }

        let new_leaf_id = node::path_id(&new_idxs[..=k]);
        self.put_placeholder_leaf(new_leaf_id, new_key, new_value)?;
        let old_leaf_id = node::path_id(&old_idxs[..=k]);
        self.put_placeholder_leaf(old_leaf_id, existing.key, existing.value)?;

        let mut prev_id: Option<PathId> = None;
        for level in (depth + 1..=k).rev() {
            let this_path = &new_idxs[..level];
            let this_id = node::path_id(this_path);
            let mut children = BTreeMap::new();
            if level == k {
                children.insert(new_idxs[k], new_leaf_id);
                children.insert(old_idxs[k], old_leaf_id);
            } else {
                children.insert(new_idxs[level], prev_id.expect("inner level always follows a child"));
            }
            let draft = InnerNode {
                commitment: crate::curve::Point::zero(),
                hash: Scalar::zero(),
                children,
            };
            self.store.put(this_id, Node::Inner(draft).encode()).map_err(TrieError::from)?;
            prev_id = Some(this_id);
        }
        Ok(())
    }

    fn recompute_all_commitments(&mut self) -> Result<()> {
        self.recompute_subtree(self.root_id())?;
        Ok(())
    }

    fn recompute_subtree(&mut self, id: PathId) -> Result<Scalar> {
        let current = if id == self.root_id() {
            self.load_inner_or_empty_root(id)?
        } else {
            match self.load_node(id)? {
                Node::Inner(i) => i,
                Node::Leaf(l) => {
                    let recomputed = LeafNode::new(&self.scheme, l.key, l.value);
                    self.store
                        .put(id, Node::Leaf(recomputed).encode())
                        .map_err(TrieError::from)?;
                    return Ok(recomputed.hash);
                }
            }
        };

        let mut hashes: BTreeMap<usize, Scalar> = BTreeMap::new();
        let children: Vec<(usize, PathId)> = current.children.iter().map(|(&i, &id)| (i, id)).collect();
        for (i, child_id) in children {
            let h = self.recompute_subtree(child_id)?;
            hashes.insert(i, h);
        }
        let commitment = self.scheme.pedersen_commit_sparse(&hashes);
        let hash = curve::group_to_field(&commitment);
        let rebuilt = InnerNode {
            commitment,
            hash,
            children: current.children,
        };
        self.store.put(id, Node::Inner(rebuilt).encode()).map_err(TrieError::from)?;
        Ok(hash)
    }

    // ---- update with incremental commitments (§4.3) -------------------

    /// Inserts `key` (if absent) or rewrites its value (if present),
    /// maintaining every ancestor's commitment incrementally. Never fails
    /// on an already-present key (that's just an update) — see
    /// [`crate::error::TrieError`]'s doc comment on `DuplicateKey`.
    #[instrument(level = "debug", skip(self, value))]
    pub fn update(&mut self, key: Key, value: Value) -> Result<()> {
        let idxs = self.indices_for(&key);
        let new_leaf = LeafNode::new(&self.scheme, key, value);

        let mut path: Vec<(usize, PathId, InnerNode)> = Vec::new();
        let mut prefix: Vec<usize> = Vec::new();
        let mut current_id = self.root_id();
        let mut depth = 0usize;

        let value_change: Scalar;
        loop {
            let current = self.load_inner_or_empty_root(current_id)?;
            let i = idxs[depth];
            match current.children.get(&i).copied() {
                None => {
                    value_change = new_leaf.hash;
                    path.push((i, current_id, current));
                    let mut leaf_path = prefix.clone();
                    leaf_path.push(i);
                    let leaf_id = node::path_id(&leaf_path);
                    path.last_mut().unwrap().2.children.insert(i, leaf_id);
                    self.finish_update(path, value_change, vec![(leaf_id, Node::Leaf(new_leaf))])?;
                    return Ok(());
                }
                Some(child_id) => match self.load_node(child_id)? {
                    Node::Inner(_) => {
                        path.push((i, current_id, current));
                        prefix.push(i);
                        current_id = child_id;
                        depth += 1;
                        continue;
                    }
                    Node::Leaf(existing) => {
                        if existing.key == key {
                            let change = new_leaf.hash - existing.hash;
                            path.push((i, current_id, current));
                            self.finish_update(path, change, vec![(child_id, Node::Leaf(new_leaf))])?;
                            return Ok(());
                        }
                        let (subtree_root_id, subtree_root_hash, writes) =
                            self.build_collision_subtree(&prefix, i, depth, existing, new_leaf)?;
                        debug_assert_eq!(subtree_root_id, child_id);
                        let change = subtree_root_hash - existing.hash;
                        path.push((i, current_id, current));
                        self.finish_update(path, change, writes)?;
                        return Ok(());
                    }
                },
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn build_collision_subtree(
        &self,
        prefix: &[usize],
        i: usize,
        depth: usize,
        existing: LeafNode,
        new_leaf: LeafNode,
    ) -> Result<(PathId, Scalar, Vec<(PathId, Node)>)> {
        let new_idxs = self.indices_for(&new_leaf.key);
        let old_idxs = self.indices_for(&existing.key);

        let mut k = depth + 1;
        while new_idxs[k] == old_idxs[k] {
            k += 1;
        }

        let new_leaf_id = node::path_id(&new_idxs[..=k]);
        let old_leaf_id = node::path_id(&old_idxs[..=k]);
        let mut writes = vec![
            (new_leaf_id, Node::Leaf(new_leaf)),
            (old_leaf_id, Node::Leaf(existing)),
        ];

        let mut prev_id = new_leaf_id;
        let mut prev_hash = new_leaf.hash;
        let mut base_id = None;
        let mut base_hash = Scalar::zero();

        for level in (depth + 1..=k).rev() {
            let this_path = &new_idxs[..level];
            let this_id = node::path_id(this_path);
            let mut child_hashes = BTreeMap::new();
            let mut children = BTreeMap::new();
            if level == k {
                children.insert(new_idxs[k], new_leaf_id);
                children.insert(old_idxs[k], old_leaf_id);
                child_hashes.insert(new_idxs[k], new_leaf.hash);
                child_hashes.insert(old_idxs[k], existing.hash);
            } else {
                children.insert(new_idxs[level], prev_id);
                child_hashes.insert(new_idxs[level], prev_hash);
            }
            let commitment = self.scheme.pedersen_commit_sparse(&child_hashes);
            let hash = curve::group_to_field(&commitment);
            writes.push((this_id, Node::Inner(InnerNode { commitment, hash, children })));
            prev_id = this_id;
            prev_hash = hash;
            base_id = Some(this_id);
            base_hash = hash;
        }

        let _ = prefix;
        let _ = i;
        Ok((base_id.expect("loop runs at least once"), base_hash, writes))
    }

    /// Applies the incremental-commitment propagation of spec §4.3 step 4
    /// to every ancestor in `path` (root-first order), then writes
    /// everything (ancestors plus `extra_writes`, the newly created leaf or
    /// subtree) in a single store batch.
    fn finish_update(
        &mut self,
        path: Vec<(usize, PathId, InnerNode)>,
        mut value_change: Scalar,
        extra_writes: Vec<(PathId, Node)>,
    ) -> Result<()> {
        let mut batch: Vec<(PathId, Vec<u8>)> = extra_writes
            .into_iter()
            .map(|(id, node)| (id, node.encode()))
            .collect();

        for (i, node_id, mut inner) in path.into_iter().rev() {
            let old_hash = inner.hash;
            inner.commitment = inner.commitment.add(&self.scheme.g[i].mul(value_change));
            inner.hash = curve::group_to_field(&inner.commitment);
            value_change = inner.hash - old_hash;
            debug!(node = %hex::encode(node_id), "recommitted inner node");
            batch.push((node_id, Node::Inner(inner).encode()));
        }

        self.store.batch_write(batch).map_err(TrieError::from)
    }

    // ---- delete with collapse (§4.4) -----------------------------------

    /// Removes `key`. Fails with `KeyNotFound` if it isn't present.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&mut self, key: Key) -> Result<()> {
        let idxs = self.indices_for(&key);
        let mut path: Vec<(usize, PathId, InnerNode)> = Vec::new();
        let mut current_id = self.root_id();
        let mut depth = 0usize;

        let leaf_path_id;
        loop {
            let current = self.load_inner_or_empty_root(current_id)?;
            let i = idxs[depth];
            match current.children.get(&i).copied() {
                None => return Err(TrieError::KeyNotFound),
                Some(child_id) => match self.load_node(child_id)? {
                    Node::Inner(_) => {
                        path.push((i, current_id, current));
                        current_id = child_id;
                        depth += 1;
                        continue;
                    }
                    Node::Leaf(found) => {
                        if found.key != key {
                            return Err(TrieError::KeyNotFound);
                        }
                        leaf_path_id = child_id;
                        path.push((i, current_id, current));
                        break;
                    }
                },
            }
        }

        let deleted_hash = {
            match self.load_node(leaf_path_id)? {
                Node::Leaf(l) => l.hash,
                Node::Inner(_) => unreachable!("already matched as a leaf above"),
            }
        };

        let root_id = self.root_id();
        let bottom_level = path.len() - 1;

        let mut pending_writes: HashMap<PathId, Node> = HashMap::new();
        let mut pending_deletes: Vec<PathId> = vec![leaf_path_id];

        let mut value_change = Scalar::zero() - deleted_hash;
        let mut current_slot_is_leaf: Option<LeafNode> = None;

        for (level, (i, node_id, mut inner)) in path.into_iter().enumerate().rev() {
            let is_root = node_id == root_id;

            if level == bottom_level {
                inner.children.remove(&i);
            }

            let collapse_into: Option<(PathId, LeafNode)> = if !is_root && inner.children.len() == 1 {
                let (&only_idx, &only_id) = inner.children.iter().next().unwrap();
                let _ = only_idx;
                if level == bottom_level {
                    match self.load_node(only_id)? {
                        Node::Leaf(l) => Some((only_id, l)),
                        Node::Inner(_) => None,
                    }
                } else {
                    current_slot_is_leaf.clone().map(|l| (only_id, l))
                }
            } else {
                None
            };

            match collapse_into {
                Some((superseded_id, leaf)) => {
                    pending_writes.remove(&superseded_id);
                    pending_deletes.push(superseded_id);
                    let new_change = leaf.hash - inner.hash;
                    pending_writes.insert(node_id, Node::Leaf(leaf.clone()));
                    value_change = new_change;
                    current_slot_is_leaf = Some(leaf);
                }
                None => {
                    let old_hash = inner.hash;
                    inner.commitment = inner.commitment.add(&self.scheme.g[i].mul(value_change));
                    inner.hash = curve::group_to_field(&inner.commitment);
                    value_change = inner.hash - old_hash;
                    pending_writes.insert(node_id, Node::Inner(inner));
                    current_slot_is_leaf = None;
                }
            }
        }

        let batch: Vec<(PathId, Vec<u8>)> = pending_writes
            .into_iter()
            .map(|(id, node)| (id, node.encode()))
            .collect();
        self.store.batch_write(batch).map_err(TrieError::from)?;
        for id in pending_deletes {
            if let Err(e) = self.store.delete(&id) {
                warn!(error = %e, "failed to delete orphaned node (best-effort GC)");
            }
        }
        Ok(())
    }

    // ---- diagnostics (§4.5/§8, shared with the `diagnostics` module) ---

    pub(crate) fn walk_leaves(&self) -> Result<Vec<(Vec<usize>, LeafNode)>> {
        let mut out = Vec::new();
        self.walk_leaves_from(self.root_id(), Vec::new(), &mut out)?;
        Ok(out)
    }

    fn walk_leaves_from(&self, id: PathId, prefix: Vec<usize>, out: &mut Vec<(Vec<usize>, LeafNode)>) -> Result<()> {
        let inner = self.load_inner_or_empty_root(id)?;
        for (&i, &child_id) in &inner.children {
            match self.load_node(child_id)? {
                Node::Leaf(l) => {
                    let mut path = prefix.clone();
                    path.push(i);
                    out.push((path, l));
                }
                Node::Inner(_) => {
                    let mut path = prefix.clone();
                    path.push(i);
                    self.walk_leaves_from(child_id, path, out)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn root_inner(&self) -> Result<InnerNode> {
        self.load_inner_or_empty_root(self.root_id())
    }

    pub(crate) fn load_inner_checked(&self, id: PathId) -> Result<InnerNode> {
        self.load_inner_or_empty_root(id)
    }

    pub(crate) fn load_any(&self, id: PathId) -> Result<Node> {
        self.load_node(id)
    }
}
