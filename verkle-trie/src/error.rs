//! Error kinds surfaced by the trie core.
//!
//! Every fallible public operation returns `Result<_, TrieError>`. There is
//! no `DuplicateKey` variant: inserting an already-present key is simply an
//! update (see [`crate::trie::VerkleTrie::update`]), so a variant nobody
//! would ever construct would just be dead weight.

/// Errors surfaced by trie operations.
#[derive(Debug, thiserror::Error)]
pub enum TrieError {
    /// `delete` or a proof was requested for a key not present in the trie.
    #[error("key not found")]
    KeyNotFound,

    /// The underlying node store reported a failure. Never recovered from
    /// inside the core.
    #[error("store error: {0}")]
    StoreError(#[from] verkle_db::DbError),

    /// A proof's declared structure (depths / commitment list) doesn't
    /// reconstruct to a consistent `(Cs, indices, ys)` sequence.
    #[error("malformed proof: {0}")]
    ProofMalformed(String),

    /// The IPA / transcript check failed against an otherwise
    /// well-formed proof.
    #[error("invalid proof")]
    ProofInvalid,

    /// `check_valid_tree` found a commitment, hash, or structural
    /// invariant violation. Fatal: the trie is corrupt and should not be
    /// trusted for further operations.
    #[error("trie corruption detected: {0}")]
    Corruption(String),
}

pub type Result<T> = std::result::Result<T, TrieError>;
