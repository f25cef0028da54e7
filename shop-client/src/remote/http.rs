// shop-client/src/remote/http.rs
// HTTP transport - network I/O against the backend endpoint

use async_trait::async_trait;
use reqwest::Client;
use shared::{BackendRequest, Method};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// The backend only accepts "simple" requests, so JSON bodies go out as plain text
pub const POST_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Moves one backend request over the wire and returns the decoded JSON
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &BackendRequest) -> ClientResult<serde_json::Value>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint_url: String,
}

impl HttpTransport {
    pub fn new(endpoint_url: &str, timeout: Duration) -> ClientResult<Self> {
        if endpoint_url.trim().is_empty() {
            return Err(ClientError::Config("endpoint URL is empty".into()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint_url: endpoint_url.trim().to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(&config.endpoint_url, config.timeout)
    }

    /// 获取端点 URL
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    async fn handle_response(&self, response: reqwest::Response) -> ClientResult<serde_json::Value> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text)
            .map_err(|e| ClientError::InvalidResponse(format!("malformed JSON: {}", e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &BackendRequest) -> ClientResult<serde_json::Value> {
        let req = match request.method {
            Method::Get => self
                .client
                .get(&self.endpoint_url)
                .query(&request.query_pairs()),
            Method::Post => self
                .client
                .post(&self.endpoint_url)
                .header(reqwest::header::CONTENT_TYPE, POST_CONTENT_TYPE)
                .body(request.envelope_body()?),
        };
        let response = req.send().await?;
        self.handle_response(response).await
    }
}
