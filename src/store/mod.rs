//! Document storage for jokes.
//!
//! The storage layer is a thin passthrough over a document store's native
//! operations: insert, find, update and delete by identifier, plus
//! skip/limit pagination. Handlers never talk to it directly; they go
//! through [`crate::services::JokeService`].
//!
//! # Module Structure
//!
//! - `object_id` - 12-byte document identifiers with hex wire form
//! - `memory` - In-process document store backed by ordered maps

mod memory;
mod object_id;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Joke, JokeUpdate};

pub use memory::MemoryStore;
pub use object_id::{OBJECT_ID_HEX_LEN, OBJECT_ID_LEN, ObjectId, ObjectIdError};

/// Errors reported by the storage collaborator.
///
/// `NotFound` is the only variant handlers translate to 404; everything else
/// is a server-side failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no joke found with id {0}")]
    NotFound(ObjectId),

    #[error(transparent)]
    InvalidId(#[from] ObjectIdError),

    #[error("duplicate key: a joke with id {0} already exists")]
    DuplicateKey(ObjectId),

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    #[error("storage failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error means the document does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Convenience type alias for storage results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Identifier-typed document operations.
#[async_trait]
pub trait JokeRepository: Send + Sync {
    /// Insert a new document and return it as stored.
    async fn create(&self, joke: Joke) -> StoreResult<Joke>;

    /// Find a document by identifier.
    async fn get(&self, id: ObjectId) -> StoreResult<Joke>;

    /// Apply an update and return the full document after the change.
    async fn update(&self, update: JokeUpdate) -> StoreResult<Joke>;

    /// Delete a document. Deleting an absent identifier is not an error.
    async fn delete(&self, id: ObjectId) -> StoreResult<()>;

    /// Return up to `limit` documents after skipping `skip`, in insertion order.
    async fn list(&self, skip: u64, limit: u64) -> StoreResult<Vec<Joke>>;
}
