use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::models::{Joke, JokeUpdate};
use crate::store::{JokeRepository, ObjectId, StoreResult};

/// Joke operations as seen by the HTTP layer.
///
/// Identifiers arrive as hex strings straight from the request path and are
/// converted here, so an invalid id surfaces as
/// [`StoreError::InvalidId`](crate::store::StoreError::InvalidId).
#[async_trait]
pub trait JokeService: Send + Sync {
    async fn create_joke(&self, joke: Joke) -> StoreResult<Joke>;

    async fn get_joke(&self, id: &str) -> StoreResult<Joke>;

    async fn update_joke(&self, update: JokeUpdate) -> StoreResult<Joke>;

    async fn delete_joke(&self, id: &str) -> StoreResult<()>;

    /// List jokes, skipping `skip` documents and returning at most `limit`.
    async fn list_jokes(&self, skip: u64, limit: u64) -> StoreResult<Vec<Joke>>;
}

/// Default [`JokeService`] backed by any [`JokeRepository`].
pub struct JokeServiceImpl<R> {
    repo: Arc<R>,
}

impl<R: JokeRepository> JokeServiceImpl<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R: JokeRepository + 'static> JokeService for JokeServiceImpl<R> {
    #[instrument(skip(self, joke), fields(id = %joke.id))]
    async fn create_joke(&self, joke: Joke) -> StoreResult<Joke> {
        self.repo.create(joke).await
    }

    #[instrument(skip(self))]
    async fn get_joke(&self, id: &str) -> StoreResult<Joke> {
        let id = ObjectId::parse_str(id)?;
        self.repo.get(id).await
    }

    #[instrument(skip(self, update), fields(id = %update.id))]
    async fn update_joke(&self, update: JokeUpdate) -> StoreResult<Joke> {
        self.repo.update(update).await
    }

    #[instrument(skip(self))]
    async fn delete_joke(&self, id: &str) -> StoreResult<()> {
        let id = ObjectId::parse_str(id)?;
        self.repo.delete(id).await
    }

    #[instrument(skip(self))]
    async fn list_jokes(&self, skip: u64, limit: u64) -> StoreResult<Vec<Joke>> {
        self.repo.list(skip, limit).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};

    fn service() -> (Arc<MemoryStore>, JokeServiceImpl<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), JokeServiceImpl::new(store))
    }

    #[tokio::test]
    async fn test_get_by_hex_id() {
        let (_, service) = service();
        let created = service.create_joke(Joke::new("pun intended")).await.unwrap();

        let fetched = service.get_joke(&created.id.to_hex()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_invalid_hex_is_invalid_id() {
        let (_, service) = service();
        let err = service.get_joke("not-an-object-id").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let (_, service) = service();
        let err = service
            .get_joke(&ObjectId::new().to_hex())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_removes_from_store() {
        let (store, service) = service();
        let created = service.create_joke(Joke::new("gone soon")).await.unwrap();

        service.delete_joke(&created.id.to_hex()).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_invalid_hex_is_invalid_id() {
        let (_, service) = service();
        let err = service.delete_joke("xyz").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_update_returns_full_document() {
        let (_, service) = service();
        let created = service.create_joke(Joke::new("before")).await.unwrap();

        let updated = service
            .update_joke(JokeUpdate::now(created.id, "after"))
            .await
            .unwrap();

        assert_eq!(updated.joke, "after");
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_list_passes_skip_and_limit_through() {
        let (_, service) = service();
        for i in 0..7 {
            service.create_joke(Joke::new(format!("j{i}"))).await.unwrap();
        }

        let page = service.list_jokes(5, 10).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.first().unwrap().joke, "j5");
    }
}
