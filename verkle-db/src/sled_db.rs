use std::path::Path;

use crate::{DbError, NodeId, NodeStore};

/// `sled`-backed [`NodeStore`]. This is the default on-disk backend; the
/// teacher crate declared a `sled_db` feature but never wired an
/// implementation to it, only a wasm/JS bridge (`jsdb_impl.rs`) — this
/// fills that gap with a native backend instead.
pub struct SledDb {
    db: sled::Db,
}

impl SledDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let db = sled::open(path).map_err(|e| DbError::Backend(e.to_string()))?;
        Ok(Self { db })
    }

    /// Removes the database at `path` entirely. Used only by the benchmark
    /// harness between runs — the trie core never calls this.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<(), DbError> {
        std::fs::remove_dir_all(path).or_else(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Ok(())
            } else {
                Err(DbError::Backend(e.to_string()))
            }
        })
    }
}

impl NodeStore for SledDb {
    fn get(&self, id: &NodeId) -> Result<Option<Vec<u8>>, DbError> {
        self.db
            .get(id)
            .map(|opt| opt.map(|ivec| ivec.to_vec()))
            .map_err(|e| DbError::Backend(e.to_string()))
    }

    fn put(&self, id: NodeId, payload: Vec<u8>) -> Result<(), DbError> {
        self.db
            .insert(id, payload)
            .map(|_| ())
            .map_err(|e| DbError::Backend(e.to_string()))
    }

    fn delete(&self, id: &NodeId) -> Result<(), DbError> {
        self.db
            .remove(id)
            .map(|_| ())
            .map_err(|e| DbError::Backend(e.to_string()))
    }

    fn batch_write(&self, entries: Vec<(NodeId, Vec<u8>)>) -> Result<(), DbError> {
        let mut batch = sled::Batch::default();
        for (id, payload) in entries {
            batch.insert(&id, payload);
        }
        self.db
            .apply_batch(batch)
            .map_err(|e| DbError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let db = SledDb::open(dir.path()).unwrap();
        let id = [7u8; 32];
        assert!(db.get(&id).unwrap().is_none());
        db.put(id, vec![9, 9, 9]).unwrap();
        assert_eq!(db.get(&id).unwrap(), Some(vec![9, 9, 9]));
        db.delete(&id).unwrap();
        assert!(db.get(&id).unwrap().is_none());
    }

    #[test]
    fn batch_write_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let db = SledDb::open(dir.path()).unwrap();
        db.batch_write(vec![([1u8; 32], vec![1]), ([2u8; 32], vec![2])])
            .unwrap();
        assert_eq!(db.get(&[1u8; 32]).unwrap(), Some(vec![1]));
        assert_eq!(db.get(&[2u8; 32]).unwrap(), Some(vec![2]));
    }
}
