use axum::{
    extract::{Path, Json, Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::{self, JoinError};
use tracing::info;

use crate::application::{
    Analysis, AnalysisError, BivariateView, CategoricalView, CorrelationMatrix, DatasetPreparer,
    TimeSeriesView, UnivariateView,
};
use crate::domain::entity::{
    CleaningConfig, CleaningReport, ColumnClassification, MissingValueStrategy, PreparedDataset,
    RawTable, SessionId, Value,
};
use crate::domain::repository::{SessionRepository, RepositoryError};
use crate::infrastructure::parser::{DelimitedParser, ParseError};

/// 名前が指定されなかった場合のデータセット名
const DEFAULT_DATASET_NAME: &str = "upload";

/// プレビューの既定行数
const DEFAULT_PREVIEW_ROWS: usize = 5;

/// API エラー
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unknown missing-value strategy: {0} (expected drop, fill_central_tendency or fill_constant)")]
    InvalidStrategy(String),

    #[error("Could not read uploaded file: {0}")]
    Parse(#[from] ParseError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Background task failed: {0}")]
    Task(#[from] JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidStrategy(_) | ApiError::Parse(_) => StatusCode::BAD_REQUEST,
            ApiError::Repository(RepositoryError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Repository(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Analysis(AnalysisError::NothingToDisplay(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Analysis(AnalysisError::ColumnNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Analysis(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// アップロード時のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    strategy: Option<String>,
    name: Option<String>,
}

/// 欠損値処理の変更リクエスト
#[derive(Debug, Serialize, Deserialize)]
pub struct StrategyRequest {
    pub strategy: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    limit: Option<usize>,
}

/// セッション情報のレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub report: CleaningReport,
    pub classification: ColumnClassification,
}

impl SessionResponse {
    fn new(session_id: SessionId, prepared: &PreparedDataset) -> Self {
        Self {
            session_id,
            report: prepared.report.clone(),
            classification: prepared.classification.clone(),
        }
    }
}

/// プレビューのレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
}

fn parse_strategy(raw: &str) -> Result<MissingValueStrategy, ApiError> {
    MissingValueStrategy::from_str(raw.trim())
        .map_err(|_| ApiError::InvalidStrategy(raw.to_string()))
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Integer(i) => serde_json::Value::Number(serde_json::Number::from(*i)),
        Value::Float(f) => {
            if let Some(num) = serde_json::Number::from_f64(*f) {
                serde_json::Value::Number(num)
            } else {
                serde_json::Value::Null
            }
        },
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Timestamp(_) => serde_json::Value::String(value.to_string()),
        Value::Null => serde_json::Value::Null,
    }
}

/// ヘルスチェックハンドラー
pub async fn health_check_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// セッション一覧取得ハンドラー
pub async fn list_sessions_handler(
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
) -> Result<Json<Vec<SessionId>>, ApiError> {
    let ids = repository.session_ids().await?;
    Ok(Json(ids))
}

/// アップロードハンドラー：解析・クリーニングしてセッションを作成する
pub async fn upload_handler(
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
    Extension(parser): Extension<Arc<DelimitedParser>>,
    Extension(default_strategy): Extension<MissingValueStrategy>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let strategy = match params.strategy.as_deref() {
        Some(raw) => parse_strategy(raw)?,
        None => default_strategy,
    };
    let name = params.name.unwrap_or_else(|| DEFAULT_DATASET_NAME.to_string());
    let config = CleaningConfig::with_strategy(strategy);

    // 解析とクリーニングは CPU を占有するのでブロッキング用スレッドで行う
    let preparer = DatasetPreparer::new(config.clone());
    let (raw, prepared) = task::spawn_blocking(move || -> Result<_, ParseError> {
        let raw = parser.parse(&name, &body)?;
        let prepared = preparer.prepare(&raw);
        Ok((raw, prepared))
    })
    .await??;

    let response_report = prepared.report.clone();
    let response_classification = prepared.classification.clone();
    let session_id = repository.create_session(Arc::new(raw), config, prepared).await?;

    info!(session = %session_id, strategy = %strategy, "session created");

    Ok((StatusCode::CREATED, Json(SessionResponse {
        session_id,
        report: response_report,
        classification: response_classification,
    })))
}

/// セッション詳細取得ハンドラー
pub async fn get_session_handler(
    Path(id): Path<u64>,
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = repository.get_session(SessionId(id)).await?;
    Ok(Json(SessionResponse::new(session.id, &session.prepared)))
}

/// セッション削除ハンドラー
pub async fn delete_session_handler(
    Path(id): Path<u64>,
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
) -> Result<StatusCode, ApiError> {
    repository.delete_session(SessionId(id)).await?;
    info!(session = id, "session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// 欠損値処理の変更：生データからパイプライン全体を再実行する
pub async fn update_strategy_handler(
    Path(id): Path<u64>,
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
    Json(payload): Json<StrategyRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let strategy = parse_strategy(&payload.strategy)?;
    let session = repository.get_session(SessionId(id)).await?;

    let config = CleaningConfig {
        strategy,
        ..session.config.clone()
    };
    let preparer = DatasetPreparer::new(config.clone());
    let raw: Arc<RawTable> = Arc::clone(&session.raw);
    let prepared = task::spawn_blocking(move || preparer.prepare(&raw)).await?;
    let response = SessionResponse::new(session.id, &prepared);

    repository.update_session(session.id, config, prepared).await?;
    info!(session = %session.id, strategy = %strategy, "session re-cleaned");

    Ok(Json(response))
}

/// クリーニング済みデータの先頭行
pub async fn preview_handler(
    Path(id): Path<u64>,
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
    Query(params): Query<PreviewParams>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let session = repository.get_session(SessionId(id)).await?;
    let prepared = &session.prepared;

    let columns: Vec<String> = prepared.table.schema.column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let rows = Analysis::of(prepared)
        .preview(params.limit.unwrap_or(DEFAULT_PREVIEW_ROWS))
        .into_iter()
        .map(|row| {
            let mut obj = serde_json::Map::new();
            for column in &columns {
                obj.insert(column.clone(), value_to_json(row.value(column)));
            }
            serde_json::Value::Object(obj)
        })
        .collect();

    Ok(Json(PreviewResponse { columns, rows }))
}

/// 単変量ビュー
pub async fn univariate_handler(
    Path((id, column)): Path<(u64, String)>,
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
) -> Result<Json<UnivariateView>, ApiError> {
    let session = repository.get_session(SessionId(id)).await?;
    let view = Analysis::of(&session.prepared).univariate(&column)?;
    Ok(Json(view))
}

/// カテゴリビュー
pub async fn categorical_handler(
    Path((id, column)): Path<(u64, String)>,
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
) -> Result<Json<CategoricalView>, ApiError> {
    let session = repository.get_session(SessionId(id)).await?;
    let view = Analysis::of(&session.prepared).categorical(&column)?;
    Ok(Json(view))
}

/// カテゴリ別価格ビュー
pub async fn bivariate_handler(
    Path(id): Path<u64>,
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
) -> Result<Json<BivariateView>, ApiError> {
    let session = repository.get_session(SessionId(id)).await?;
    let view = Analysis::of(&session.prepared).bivariate()?;
    Ok(Json(view))
}

/// 日次四本値ビュー
pub async fn time_series_handler(
    Path(id): Path<u64>,
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
) -> Result<Json<TimeSeriesView>, ApiError> {
    let session = repository.get_session(SessionId(id)).await?;
    let view = Analysis::of(&session.prepared).time_series()?;
    Ok(Json(view))
}

/// 相関行列ビュー
pub async fn correlation_handler(
    Path(id): Path<u64>,
    Extension(repository): Extension<Arc<dyn SessionRepository>>,
) -> Result<Json<CorrelationMatrix>, ApiError> {
    let session = repository.get_session(SessionId(id)).await?;
    let view = Analysis::of(&session.prepared).correlation()?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Session;
    use crate::domain::repository::MockSessionRepository;
    use mockall::predicate::eq;

    fn repository(mock: MockSessionRepository) -> Extension<Arc<dyn SessionRepository>> {
        Extension(Arc::new(mock))
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let mut mock = MockSessionRepository::new();
        mock.expect_get_session()
            .with(eq(SessionId(7)))
            .times(1)
            .returning(|id| Err(RepositoryError::SessionNotFound(id)));

        let err = get_session_handler(Path(7), repository(mock)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_strategy_is_rejected_before_lookup() {
        let mut mock = MockSessionRepository::new();
        mock.expect_get_session().never();

        let payload = Json(StrategyRequest { strategy: "mean".to_string() });
        let err = update_strategy_handler(Path(1), repository(mock), payload).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidStrategy(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn storage_failure_is_an_internal_error() {
        let mut mock = MockSessionRepository::new();
        mock.expect_session_ids()
            .returning(|| Err(RepositoryError::StorageError("lock poisoned".to_string())));

        let err = list_sessions_handler(repository(mock)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    const ORDERS: &str = "order_id,order_date,price,quantity\n1,2024-01-01,10,1\n1,2024-01-01,10,1\n2,2024-01-02,,2\n";

    fn parser() -> Extension<Arc<DelimitedParser>> {
        Extension(Arc::new(DelimitedParser::default()))
    }

    #[tokio::test]
    async fn upload_cleans_off_the_async_runtime_and_stores_result() {
        let mut mock = MockSessionRepository::new();
        mock.expect_create_session()
            .withf(|raw, config, prepared| {
                raw.len() == 3
                    && config.strategy == MissingValueStrategy::FillConstant
                    && prepared.report.removed_duplicate_count == 1
            })
            .times(1)
            .returning(|_, _, _| Ok(SessionId(3)));

        let params = Query(UploadParams { strategy: Some("fill_constant".to_string()), name: None });
        let (status, Json(body)) = upload_handler(
            repository(mock),
            parser(),
            Extension(MissingValueStrategy::Drop),
            params,
            Bytes::from_static(ORDERS.as_bytes()),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.session_id, SessionId(3));
        assert_eq!(body.report.final_row_count, 2);
    }

    #[tokio::test]
    async fn unreadable_upload_never_reaches_repository() {
        let mut mock = MockSessionRepository::new();
        mock.expect_create_session().never();

        let params = Query(UploadParams { strategy: None, name: Some("empty".to_string()) });
        let err = upload_handler(repository(mock), parser(), Extension(MissingValueStrategy::Drop), params, Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Parse(ParseError::Empty)));
    }

    #[tokio::test]
    async fn strategy_change_reruns_from_raw_table() {
        let raw = Arc::new(DelimitedParser::default().parse("orders", ORDERS.as_bytes()).unwrap());
        let config = CleaningConfig::default();
        let prepared = Arc::new(DatasetPreparer::new(config.clone()).prepare(&raw));
        let session = Session { id: SessionId(1), raw, config, prepared };

        let mut mock = MockSessionRepository::new();
        mock.expect_get_session()
            .with(eq(SessionId(1)))
            .returning(move |_| Ok(session.clone()));
        mock.expect_update_session()
            .withf(|id, config, prepared| {
                *id == SessionId(1)
                    && config.strategy == MissingValueStrategy::FillCentralTendency
                    && prepared.table.len() == 2
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let payload = Json(StrategyRequest { strategy: "fill_central_tendency".to_string() });
        let Json(body) = update_strategy_handler(Path(1), repository(mock), payload).await.unwrap();
        assert_eq!(body.report.strategy, MissingValueStrategy::FillCentralTendency);
        assert_eq!(body.report.initial_row_count, 3);
    }

    #[test]
    fn nothing_to_display_maps_to_unprocessable() {
        let err = ApiError::from(AnalysisError::NothingToDisplay("no rows".to_string()));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "Nothing to display: no rows");
    }

    #[test]
    fn strategies_parse_from_request_text() {
        assert_eq!(parse_strategy(" fill_constant ").unwrap(), MissingValueStrategy::FillConstant);
        assert!(parse_strategy("median").is_err());
    }
}
