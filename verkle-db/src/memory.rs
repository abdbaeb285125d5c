use std::collections::HashMap;
use std::sync::Mutex;

use crate::{DbError, NodeId, NodeStore};

/// In-memory [`NodeStore`], used by tests and by callers that don't need
/// persistence across process restarts. Guarded by a single mutex — the
/// trie core is single-writer anyway, so there's no contention to optimize
/// for.
#[derive(Debug, Default)]
pub struct MemoryDb {
    nodes: Mutex<HashMap<NodeId, Vec<u8>>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
        }
    }
}

impl NodeStore for MemoryDb {
    fn get(&self, id: &NodeId) -> Result<Option<Vec<u8>>, DbError> {
        Ok(self.nodes.lock().unwrap().get(id).cloned())
    }

    fn put(&self, id: NodeId, payload: Vec<u8>) -> Result<(), DbError> {
        self.nodes.lock().unwrap().insert(id, payload);
        Ok(())
    }

    fn delete(&self, id: &NodeId) -> Result<(), DbError> {
        self.nodes.lock().unwrap().remove(id);
        Ok(())
    }

    fn batch_write(&self, entries: Vec<(NodeId, Vec<u8>)>) -> Result<(), DbError> {
        let mut nodes = self.nodes.lock().unwrap();
        for (id, payload) in entries {
            nodes.insert(id, payload);
        }
        Ok(())
    }
}
