use std::sync::Arc;
use async_trait::async_trait;

use crate::domain::entity::{CleaningConfig, PreparedDataset, RawTable, Session, SessionId};
use crate::domain::repository::{SessionRepository, RepositoryError};
use crate::infrastructure::storage::{MemoryStorage, StorageError};

/// インメモリリポジトリの実装
pub struct MemorySessionRepository {
    storage: Arc<MemoryStorage>,
}

impl MemorySessionRepository {
    pub fn new(storage: Arc<MemoryStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create_session(
        &self,
        raw: Arc<RawTable>,
        config: CleaningConfig,
        prepared: PreparedDataset,
    ) -> Result<SessionId, RepositoryError> {
        self.storage.create_session(raw, config, prepared)
            .map_err(RepositoryError::from)
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, RepositoryError> {
        self.storage.get_session(id)
            .map_err(RepositoryError::from)
    }

    async fn update_session(
        &self,
        id: SessionId,
        config: CleaningConfig,
        prepared: PreparedDataset,
    ) -> Result<(), RepositoryError> {
        self.storage.update_session(id, config, prepared)
            .map_err(RepositoryError::from)
    }

    async fn session_ids(&self) -> Result<Vec<SessionId>, RepositoryError> {
        self.storage.session_ids()
            .map_err(RepositoryError::from)
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), RepositoryError> {
        self.storage.delete_session(id)
            .map_err(RepositoryError::from)
    }
}

impl From<StorageError> for RepositoryError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::SessionNotFound(id) => RepositoryError::SessionNotFound(id),
            StorageError::LockPoisoned => RepositoryError::StorageError(error.to_string()),
        }
    }
}
