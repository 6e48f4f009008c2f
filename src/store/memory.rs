//! In-process document store.
//!
//! Documents live in a `BTreeMap` keyed by insertion sequence so that
//! skip/limit pagination walks them in insertion order, with a side index
//! from [`ObjectId`] to sequence for point lookups. A single
//! `parking_lot::RwLock` guards both maps; no lock is held across an await.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use super::{JokeRepository, ObjectId, StoreError, StoreResult};
use crate::models::{Joke, JokeUpdate};

#[derive(Default)]
struct Documents {
    by_seq: BTreeMap<u64, Joke>,
    index: HashMap<ObjectId, u64>,
    next_seq: u64,
}

/// Thread-safe in-memory joke store.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<Documents>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.read().index.len()
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JokeRepository for MemoryStore {
    #[instrument(skip(self, joke), fields(id = %joke.id))]
    async fn create(&self, joke: Joke) -> StoreResult<Joke> {
        let mut docs = self.docs.write();

        if docs.index.contains_key(&joke.id) {
            return Err(StoreError::DuplicateKey(joke.id));
        }

        let seq = docs.next_seq;
        docs.next_seq += 1;
        docs.index.insert(joke.id, seq);
        docs.by_seq.insert(seq, joke.clone());

        debug!(seq, "Inserted joke");
        Ok(joke)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: ObjectId) -> StoreResult<Joke> {
        let docs = self.docs.read();
        docs.index
            .get(&id)
            .and_then(|seq| docs.by_seq.get(seq))
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    #[instrument(skip(self, update), fields(id = %update.id))]
    async fn update(&self, update: JokeUpdate) -> StoreResult<Joke> {
        let mut docs = self.docs.write();

        let seq = *docs
            .index
            .get(&update.id)
            .ok_or(StoreError::NotFound(update.id))?;
        let stored = docs
            .by_seq
            .get_mut(&seq)
            .ok_or(StoreError::NotFound(update.id))?;

        stored.joke = update.joke;
        // Wall clocks can step backwards; never let updated_at precede created_at
        stored.updated_at = update.updated_at.max(stored.created_at);

        Ok(stored.clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: ObjectId) -> StoreResult<()> {
        let mut docs = self.docs.write();

        if let Some(seq) = docs.index.remove(&id) {
            docs.by_seq.remove(&seq);
            debug!("Deleted joke");
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, skip: u64, limit: u64) -> StoreResult<Vec<Joke>> {
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let docs = self.docs.read();
        Ok(docs.by_seq.values().skip(skip).take(limit).cloned().collect())
    }
}
