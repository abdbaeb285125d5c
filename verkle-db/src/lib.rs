//! Node-store adapter: the external ordered key/value store the trie core
//! mutates through. The core never talks to a concrete backend directly —
//! it only ever sees the [`NodeStore`] trait, so the persistence layer can
//! be swapped (disk-backed `sled`, or a plain in-memory map for tests)
//! without touching trie logic.

mod memory;
#[cfg(feature = "sled_db")]
mod sled_db;

pub use memory::MemoryDb;
#[cfg(feature = "sled_db")]
pub use sled_db::SledDb;

/// 32-byte path identifier a node is stored under.
pub type NodeId = [u8; 32];

/// Errors a store backend can surface. The trie core never recovers from
/// these itself; they're wrapped into `TrieError::StoreError` and handed
/// back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// An ordered key/value store keyed by 32-byte node identifiers.
///
/// `batch_write` must be atomic across the batch: either every entry in it
/// is visible to subsequent reads, or none are. The core issues exactly one
/// `batch_write` per mutation.
pub trait NodeStore {
    fn get(&self, id: &NodeId) -> Result<Option<Vec<u8>>, DbError>;
    fn put(&self, id: NodeId, payload: Vec<u8>) -> Result<(), DbError>;
    fn delete(&self, id: &NodeId) -> Result<(), DbError>;
    fn batch_write(&self, entries: Vec<(NodeId, Vec<u8>)>) -> Result<(), DbError>;
}
