//! HTTP API クライアント

use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::application::{BivariateView, CategoricalView, CorrelationMatrix, TimeSeriesView, UnivariateView};
use crate::domain::entity::{MissingValueStrategy, SessionId};
use crate::interface::api::{ErrorResponse, PreviewResponse, SessionResponse, StrategyRequest};

/// クライアントエラー
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// EDA サーバーのクライアント
#[derive(Debug, Clone)]
pub struct EdaClient {
    http: Client,
    base_url: String,
}

impl EdaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        Err(ClientError::Api { status: status.as_u16(), message })
    }

    /// ヘルスチェック
    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Ok(response.status().is_success())
    }

    /// ファイルをアップロードしてセッションを作る
    pub async fn upload(
        &self,
        name: &str,
        contents: impl Into<Bytes>,
        strategy: MissingValueStrategy,
    ) -> Result<SessionResponse, ClientError> {
        let strategy = strategy.to_string();
        let request = self.http
            .post(self.url("/api/sessions"))
            .query(&[("strategy", strategy.as_str()), ("name", name)])
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(contents.into());
        Self::send(request).await
    }

    pub async fn sessions(&self) -> Result<Vec<SessionId>, ClientError> {
        Self::send(self.http.get(self.url("/api/sessions"))).await
    }

    pub async fn session(&self, id: SessionId) -> Result<SessionResponse, ClientError> {
        Self::send(self.http.get(self.url(&format!("/api/sessions/{}", id)))).await
    }

    /// 欠損値処理を変更して再クリーニングする
    pub async fn set_strategy(
        &self,
        id: SessionId,
        strategy: MissingValueStrategy,
    ) -> Result<SessionResponse, ClientError> {
        let body = StrategyRequest { strategy: strategy.to_string() };
        let request = self.http
            .put(self.url(&format!("/api/sessions/{}/strategy", id)))
            .json(&body);
        Self::send(request).await
    }

    pub async fn preview(&self, id: SessionId, limit: usize) -> Result<PreviewResponse, ClientError> {
        let request = self.http
            .get(self.url(&format!("/api/sessions/{}/preview", id)))
            .query(&[("limit", limit)]);
        Self::send(request).await
    }

    pub async fn univariate(&self, id: SessionId, column: &str) -> Result<UnivariateView, ClientError> {
        Self::send(self.http.get(self.url(&format!("/api/sessions/{}/univariate/{}", id, column)))).await
    }

    pub async fn categorical(&self, id: SessionId, column: &str) -> Result<CategoricalView, ClientError> {
        Self::send(self.http.get(self.url(&format!("/api/sessions/{}/categorical/{}", id, column)))).await
    }

    pub async fn bivariate(&self, id: SessionId) -> Result<BivariateView, ClientError> {
        Self::send(self.http.get(self.url(&format!("/api/sessions/{}/bivariate", id)))).await
    }

    pub async fn time_series(&self, id: SessionId) -> Result<TimeSeriesView, ClientError> {
        Self::send(self.http.get(self.url(&format!("/api/sessions/{}/time-series", id)))).await
    }

    pub async fn correlation(&self, id: SessionId) -> Result<CorrelationMatrix, ClientError> {
        Self::send(self.http.get(self.url(&format!("/api/sessions/{}/correlation", id)))).await
    }

    pub async fn delete(&self, id: SessionId) -> Result<(), ClientError> {
        let response = self.http.delete(self.url(&format!("/api/sessions/{}", id))).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(ClientError::Api {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("unknown error").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = EdaClient::new("http://localhost:8080/");
        assert_eq!(client.url("/health"), "http://localhost:8080/health");
    }
}
