use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::entity::{CleaningConfig, PreparedDataset, RawTable, Session, SessionId};
use thiserror::Error;
use tracing::info;

/// 保持するセッション数の既定の上限
pub const DEFAULT_MAX_SESSIONS: usize = 64;

/// ストレージエラー
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Session lock poisoned")]
    LockPoisoned,
}

/// セッションのデータを保持する構造体
#[derive(Debug, Clone)]
struct SessionData {
    raw: Arc<RawTable>,
    config: CleaningConfig,
    prepared: Arc<PreparedDataset>,
}

impl SessionData {
    fn to_session(&self, id: SessionId) -> Session {
        Session {
            id,
            raw: Arc::clone(&self.raw),
            config: self.config.clone(),
            prepared: Arc::clone(&self.prepared),
        }
    }
}

/// インメモリストレージの実装
///
/// 上限を超えると最も古い（IDが最小の）セッションから破棄する。
#[derive(Debug)]
pub struct MemoryStorage {
    sessions: RwLock<HashMap<SessionId, SessionData>>,
    next_id: AtomicU64,
    max_sessions: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_max_sessions(DEFAULT_MAX_SESSIONS)
    }

    /// 保持数の上限を指定して作成する（0 は 1 とみなす）
    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            max_sessions: max_sessions.max(1),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<SessionId, SessionData>>, StorageError> {
        self.sessions.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<SessionId, SessionData>>, StorageError> {
        self.sessions.write().map_err(|_| StorageError::LockPoisoned)
    }

    /// セッションを作成する
    pub fn create_session(
        &self,
        raw: Arc<RawTable>,
        config: CleaningConfig,
        prepared: PreparedDataset,
    ) -> Result<SessionId, StorageError> {
        let mut sessions = self.write()?;

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions.keys().min().copied() else { break };
            sessions.remove(&oldest);
            info!(session = %oldest, "evicted oldest session");
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        sessions.insert(id, SessionData { raw, config, prepared: Arc::new(prepared) });
        Ok(id)
    }

    /// セッションを取得する
    pub fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        let sessions = self.read()?;

        sessions.get(&id)
            .map(|data| data.to_session(id))
            .ok_or(StorageError::SessionNotFound(id))
    }

    /// 前処理結果を置き換える（生データはそのまま）
    pub fn update_session(
        &self,
        id: SessionId,
        config: CleaningConfig,
        prepared: PreparedDataset,
    ) -> Result<(), StorageError> {
        let mut sessions = self.write()?;

        let data = sessions.get_mut(&id)
            .ok_or(StorageError::SessionNotFound(id))?;
        data.config = config;
        data.prepared = Arc::new(prepared);
        Ok(())
    }

    /// すべてのセッションIDを取得する（昇順）
    pub fn session_ids(&self) -> Result<Vec<SessionId>, StorageError> {
        let sessions = self.read()?;
        let mut ids: Vec<SessionId> = sessions.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    /// セッションを削除する
    pub fn delete_session(&self, id: SessionId) -> Result<(), StorageError> {
        let mut sessions = self.write()?;

        sessions.remove(&id)
            .map(|_| ())
            .ok_or(StorageError::SessionNotFound(id))
    }
}
