use super::models::{GenerateRequest, GenerateResponse, GenerationParams, ModelInfo, ModelsResponse};
use crate::config::Config;
use crate::util::{sanitize_response, truncate_str};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

const HEALTH_TIMEOUT_SECS: u64 = 5;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Why no output is available for a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("inference service unreachable: {0}")]
    Connection(String),
    #[error("inference service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("inference call timed out after {0}s")]
    Timeout(u64),
    #[error("invalid response from inference service: {0}")]
    InvalidResponse(String),
}

/// A text-completion service.
///
/// Implementations return the raw generated text; interpreting it is the
/// caller's job.
pub trait InferenceBackend: Send + Sync {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> impl Future<Output = Result<String, InferenceError>> + Send;
}

/// Join `path` onto `base` keeping any path prefix `base` already has.
pub fn endpoint_url(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(base.trim())?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim().trim_start_matches('/'))
}

pub(crate) fn create_http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))
}

fn map_request_error(err: reqwest::Error, timeout_secs: u64) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout(timeout_secs)
    } else if err.is_decode() || err.is_body() {
        InferenceError::InvalidResponse(err.to_string())
    } else {
        InferenceError::Connection(err.to_string())
    }
}

/// Client for the HTTP inference service (`POST /generate`, `GET /health`,
/// `GET /models`).
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    client: reqwest::Client,
    base_url: Url,
    generate_url: Url,
    timeout_secs: u64,
}

impl HttpInferenceClient {
    pub fn new(base_url: &str, generate_endpoint: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let generate_url = endpoint_url(base_url, generate_endpoint)
            .map_err(|e| anyhow::anyhow!("Invalid inference URL '{}': {}", base_url, e))?;
        let base_url = endpoint_url(base_url, "")
            .map_err(|e| anyhow::anyhow!("Invalid inference URL '{}': {}", base_url, e))?;
        Ok(Self {
            client: create_http_client()?,
            base_url,
            generate_url,
            timeout_secs,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.inference_url,
            &config.inference_endpoint,
            config.timeout_secs,
        )
    }

    pub fn generate_url(&self) -> &Url {
        &self.generate_url
    }

    /// GET `/health` with a short timeout. Non-JSON bodies come back as a
    /// JSON string.
    pub async fn health(&self) -> Result<Value, InferenceError> {
        let url = self
            .base_url
            .join("health")
            .map_err(|e| InferenceError::Connection(e.to_string()))?;
        let body = timeout(
            Duration::from_secs(HEALTH_TIMEOUT_SECS),
            self.get_text(url, HEALTH_TIMEOUT_SECS),
        )
        .await
        .map_err(|_| InferenceError::Timeout(HEALTH_TIMEOUT_SECS))??;
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    /// GET `/models`.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, InferenceError> {
        let url = self
            .base_url
            .join("models")
            .map_err(|e| InferenceError::Connection(e.to_string()))?;
        let body = timeout(
            Duration::from_secs(self.timeout_secs),
            self.get_text(url, self.timeout_secs),
        )
        .await
        .map_err(|_| InferenceError::Timeout(self.timeout_secs))??;
        serde_json::from_str::<ModelsResponse>(&body)
            .map(ModelsResponse::into_models)
            .map_err(|e| {
                InferenceError::InvalidResponse(format!("{}: {}", e, sanitize_response(&body)))
            })
    }

    async fn get_text(&self, url: Url, timeout_secs: u64) -> Result<String, InferenceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_request_error(e, timeout_secs))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_request_error(e, timeout_secs))?;
        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: sanitize_response(&text),
            });
        }
        Ok(text)
    }
}

impl InferenceBackend for HttpInferenceClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, InferenceError> {
        let request = GenerateRequest::new(model, prompt, params);
        let response = self
            .client
            .post(self.generate_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(e, self.timeout_secs))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_request_error(e, self.timeout_secs))?;

        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: sanitize_response(&text),
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            InferenceError::InvalidResponse(format!(
                "{}: {}",
                e,
                truncate_str(&sanitize_response(&text), 120)
            ))
        })?;
        Ok(parsed.text)
    }
}
