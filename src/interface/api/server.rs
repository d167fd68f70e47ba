use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, put},
    Extension,
    Server,
};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use typed_builder::TypedBuilder;

use crate::domain::entity::MissingValueStrategy;
use crate::domain::repository::SessionRepository;
use crate::infrastructure::parser::{DelimitedParser, ParserConfig};
use crate::infrastructure::repository::MemorySessionRepository;
use crate::infrastructure::storage::{MemoryStorage, DEFAULT_MAX_SESSIONS};
use crate::interface::api::handler::{
    health_check_handler,
    list_sessions_handler,
    upload_handler,
    get_session_handler,
    delete_session_handler,
    update_strategy_handler,
    preview_handler,
    univariate_handler,
    categorical_handler,
    bivariate_handler,
    time_series_handler,
    correlation_handler,
};
use crate::{Error, Result};

/// サーバー設定
#[derive(Debug, Clone, TypedBuilder)]
pub struct ServerConfig {
    #[builder(default = IpAddr::from([0, 0, 0, 0]))]
    pub host: IpAddr,

    #[builder(default = 8080)]
    pub port: u16,

    /// アップロードできるファイルの最大サイズ
    #[builder(default = 32 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// strategy が指定されなかった場合の欠損値処理
    #[builder(default)]
    pub default_strategy: MissingValueStrategy,

    /// 同時に保持するセッション数。超えると古いものから破棄する
    #[builder(default = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    #[builder(default)]
    pub parser: ParserConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ServerConfig {
    /// 環境変数で既定値を上書きする
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数で既定値を上書きする
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("ORDEREDA_HOST") {
            config.host = parse_setting("ORDEREDA_HOST", &host)?;
        }
        if let Some(port) = lookup("ORDEREDA_PORT") {
            config.port = parse_setting("ORDEREDA_PORT", &port)?;
        }
        if let Some(limit) = lookup("ORDEREDA_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_setting("ORDEREDA_MAX_UPLOAD_BYTES", &limit)?;
        }
        if let Some(strategy) = lookup("ORDEREDA_DEFAULT_STRATEGY") {
            config.default_strategy = parse_setting("ORDEREDA_DEFAULT_STRATEGY", &strategy)?;
        }
        if let Some(max) = lookup("ORDEREDA_MAX_SESSIONS") {
            config.max_sessions = parse_setting("ORDEREDA_MAX_SESSIONS", &max)?;
        }

        Ok(config)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_setting<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {}: {}", key, raw)))
}

/// ルーターを組み立てる
pub fn build_router(repository: Arc<dyn SessionRepository>, config: &ServerConfig) -> Router {
    let parser = Arc::new(DelimitedParser::new(config.parser.clone()));

    Router::new()
        .route("/health", get(health_check_handler))
        .route("/api/sessions", get(list_sessions_handler).post(upload_handler))
        .route("/api/sessions/:id", get(get_session_handler).delete(delete_session_handler))
        .route("/api/sessions/:id/strategy", put(update_strategy_handler))
        .route("/api/sessions/:id/preview", get(preview_handler))
        .route("/api/sessions/:id/univariate/:column", get(univariate_handler))
        .route("/api/sessions/:id/categorical/:column", get(categorical_handler))
        .route("/api/sessions/:id/bivariate", get(bivariate_handler))
        .route("/api/sessions/:id/time-series", get(time_series_handler))
        .route("/api/sessions/:id/correlation", get(correlation_handler))
        .layer(Extension(repository))                    // リポジトリの拡張
        .layer(Extension(parser))                        // パーサーの拡張
        .layer(Extension(config.default_strategy))       // 既定の欠損値処理
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

pub async fn start_server(config: ServerConfig) -> Result<()> {
    // ストレージとリポジトリの初期化
    let storage = Arc::new(MemoryStorage::with_max_sessions(config.max_sessions));
    let repository: Arc<dyn SessionRepository> = Arc::new(MemorySessionRepository::new(storage));

    let app = build_router(repository, &config);

    // サーバーのアドレス設定
    let addr = config.addr();

    info!("サーバーを{}で起動中...", addr);

    // サーバーの起動
    Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_strategy, MissingValueStrategy::Drop);
        assert_eq!(config.max_sessions, DEFAULT_MAX_SESSIONS);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("ORDEREDA_PORT", "9000"),
            ("ORDEREDA_HOST", "127.0.0.1"),
            ("ORDEREDA_DEFAULT_STRATEGY", "fill_constant"),
            ("ORDEREDA_MAX_SESSIONS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.addr(), "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.default_strategy, MissingValueStrategy::FillConstant);
        assert_eq!(config.max_sessions, 4);
    }

    #[test]
    fn invalid_setting_is_a_config_error() {
        let err = ServerConfig::from_lookup(lookup(&[("ORDEREDA_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
