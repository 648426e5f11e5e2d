//! Classifier service client
//!
//! HTTP boundary to the remote three-stage classifier. The service itself is a
//! black box: `classify` hands back the raw JSON so that
//! [`infrnce_common::validate`] stays the single authority over its shape.

use async_trait::async_trait;
use infrnce_common::events::DegradedReason;
use infrnce_common::ClassificationRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("infrnce-client/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Remote call errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Decode(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl RemoteError {
    /// Reason shown to the user when this failure triggers demo mode
    pub fn degraded_reason(&self) -> DegradedReason {
        match self {
            RemoteError::Network(message) => DegradedReason::NetworkError(message.clone()),
            RemoteError::Status(code, _) => DegradedReason::HttpStatus(*code),
            RemoteError::Decode(message) => DegradedReason::MalformedBody(message.clone()),
            RemoteError::Timeout(_) => DegradedReason::Timeout,
        }
    }
}

/// `GET /health` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub classifier_ready: bool,
    #[serde(default)]
    pub models_loaded: ModelsLoaded,
}

/// Which pipeline stages the service has loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelsLoaded {
    #[serde(default)]
    pub regex_patterns: bool,
    #[serde(default)]
    pub bert_model: bool,
    #[serde(default)]
    pub llm_client: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy" && self.classifier_ready
    }
}

/// `POST /api/generate` response
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    synthetic_log: Option<String>,
    message: Option<String>,
}

/// Remote classifier operations
///
/// Implementations must not apply their own fallback; the request controller
/// owns timeout and degradation policy.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Submit a log message; returns the raw response payload
    async fn classify(&self, log_message: &str) -> Result<Value, RemoteError>;

    /// Ask the service for a synthetic log line
    async fn generate(&self) -> Result<String, RemoteError>;

    /// Service and model readiness
    async fn health(&self) -> Result<HealthStatus, RemoteError>;
}

/// reqwest-backed classifier client
pub struct HttpClassifier {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpClassifier {
    /// Create a client for the service rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status(status.as_u16(), error_text));
        }
        Ok(response)
    }
}

#[async_trait]
impl ClassifierBackend for HttpClassifier {
    async fn classify(&self, log_message: &str) -> Result<Value, RemoteError> {
        let url = self.url("/api/classify");
        let body = ClassificationRequest {
            log_message: log_message.to_string(),
        };

        tracing::debug!(url = %url, bytes = log_message.len(), "Querying classifier");

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Self::check_status(response)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn generate(&self) -> Result<String, RemoteError> {
        let url = self.url("/api/generate");

        tracing::debug!(url = %url, "Requesting synthetic log");

        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let generated: GenerateResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        let has_text = |text: &String| !text.trim().is_empty();
        generated
            .synthetic_log
            .filter(has_text)
            .or_else(|| generated.message.filter(has_text))
            .ok_or_else(|| RemoteError::Decode("response carried no log text".to_string()))
    }

    async fn health(&self) -> Result<HealthStatus, RemoteError> {
        let url = self.url("/health");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}
