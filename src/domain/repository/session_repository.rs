use async_trait::async_trait;
use crate::domain::entity::{CleaningConfig, PreparedDataset, RawTable, Session, SessionId};
use crate::Error;
use std::sync::Arc;

// セッションリポジトリのエラー
#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::SessionNotFound(id) => Error::Session(format!("Session {} not found", id)),
            RepositoryError::StorageError(msg) => Error::Storage(msg),
        }
    }
}

// セッションリポジトリ - 解析セッションの保持と取得のための抽象インターフェース
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// 新しいセッションを登録し、採番したIDを返す
    async fn create_session(
        &self,
        raw: Arc<RawTable>,
        config: CleaningConfig,
        prepared: PreparedDataset,
    ) -> Result<SessionId, RepositoryError>;

    /// IDでセッションを取得する
    async fn get_session(&self, id: SessionId) -> Result<Session, RepositoryError>;

    /// 再クリーニングの結果でセッションを置き換える
    async fn update_session(
        &self,
        id: SessionId,
        config: CleaningConfig,
        prepared: PreparedDataset,
    ) -> Result<(), RepositoryError>;

    /// すべてのセッションIDを取得する
    async fn session_ids(&self) -> Result<Vec<SessionId>, RepositoryError>;

    /// セッションを削除する
    async fn delete_session(&self, id: SessionId) -> Result<(), RepositoryError>;
}
