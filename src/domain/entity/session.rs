use crate::domain::entity::cleaning::{CleaningConfig, PreparedDataset};
use crate::domain::entity::table::RawTable;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// セッション識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

/// 1回のアップロードに対応する解析セッション
///
/// `raw` はアップロード時に一度だけ作られ、以後変更されない。
/// 方針を変更した場合は `raw` からパイプライン全体を再実行して `prepared` を置き換える。
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub raw: Arc<RawTable>,
    pub config: CleaningConfig,
    pub prepared: Arc<PreparedDataset>,
}
