//! HTTP client for the generative AI service.
//!
//! [`GenAiBackend`] is the seam the rest of the crate talks to; [`GeminiClient`]
//! is the reqwest implementation. Every call reads the credential at call time,
//! so a key re-entered through the config endpoint takes effect immediately.

use crate::genai::types::{
    DownloadedMedia, GenerateContentRequest, GenerateContentResponse, Operation,
    PredictLongRunningRequest,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("scene-tutor-backend/", env!("CARGO_PKG_VERSION"));
const DEFAULT_VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Message the service returns when the key points at a project or model the
/// caller cannot reach. The learner has to pick a different key.
const CREDENTIAL_REJECTION_MARKER: &str = "Requested entity was not found.";

/// Generative AI client errors
#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Could not decode service response: {0}")]
    Decode(String),

    #[error("Request blocked by the service: {0}")]
    Blocked(String),

    #[error("No audio data received")]
    NoAudio,

    #[error("Video operation finished without a video")]
    MissingVideo,

    #[error("Video operation failed: {0}")]
    OperationFailed(String),

    #[error("Video operation did not finish within {0:?}")]
    PollTimeout(Duration),

    #[error("Video operation polling was cancelled")]
    Cancelled,
}

impl GenAiError {
    /// Whether the failure means the credential must be re-selected.
    pub fn is_credential_rejection(&self) -> bool {
        match self {
            GenAiError::Api { status, message } => {
                *status == 401 || *status == 403 || message.contains(CREDENTIAL_REJECTION_MARKER)
            }
            GenAiError::OperationFailed(message) => message.contains(CREDENTIAL_REJECTION_MARKER),
            _ => false,
        }
    }
}

/// Operations the tutor needs from the generative AI service.
#[async_trait]
pub trait GenAiBackend: Send + Sync {
    /// Text, image, structured-JSON and speech generation.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenAiError>;

    /// Submit a long-running video job and return its handle.
    async fn submit_video(
        &self,
        model: &str,
        request: &PredictLongRunningRequest,
    ) -> Result<Operation, GenAiError>;

    /// Re-read the status of a long-running job.
    async fn get_operation(&self, name: &str) -> Result<Operation, GenAiError>;

    /// Authenticated download of a result artifact.
    async fn download(&self, uri: &str) -> Result<DownloadedMedia, GenAiError>;
}

/// The service credential, shared between the client and the config endpoint.
///
/// An empty key is allowed: requests are still sent and the service rejects
/// them, which is reported per call.
#[derive(Debug, Clone, Default)]
pub struct ApiCredential {
    key: Arc<RwLock<String>>,
}

impl ApiCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Arc::new(RwLock::new(key.into())),
        }
    }

    pub fn get(&self) -> String {
        self.key.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, key: impl Into<String>) {
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = key.into();
    }

    pub fn is_empty(&self) -> bool {
        self.key.read().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Build a [`GenAiError::Api`] from a non-success response body.
///
/// The service wraps errors as `{"error": {"code", "message", "status"}}`;
/// anything else is passed through as raw text.
fn api_error(status: u16, body: &str) -> GenAiError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    GenAiError::Api { status, message }
}

/// Transport failure without the request URL, which carries the credential
/// as its `key` query parameter.
fn network_error(error: reqwest::Error) -> GenAiError {
    GenAiError::Network(error.without_url().to_string())
}

fn decode_error(error: reqwest::Error) -> GenAiError {
    GenAiError::Decode(error.without_url().to_string())
}

/// reqwest implementation of [`GenAiBackend`].
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    credential: ApiCredential,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        credential: ApiCredential,
        request_timeout: Duration,
    ) -> Result<Self, GenAiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(network_error)?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    fn model_endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn operation_endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, GenAiError> {
        let response = request
            .query(&[("key", self.credential.get())])
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = api_error(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), error = %error, "Generative AI request rejected");
            return Err(error);
        }

        Ok(response)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GenAiError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(decode_error)
    }
}

#[async_trait]
impl GenAiBackend for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenAiError> {
        tracing::debug!(model = model, "Calling generateContent");
        let url = self.model_endpoint(model, "generateContent");
        let response: GenerateContentResponse =
            self.send_json(self.http_client.post(&url).json(request)).await?;

        // A blocked prompt is still a successful call; callers decide whether
        // an empty result is fatal.
        if let Some(reason) = response.block_reason() {
            tracing::warn!(model = model, reason = reason, "Prompt blocked by the service");
        }
        Ok(response)
    }

    async fn submit_video(
        &self,
        model: &str,
        request: &PredictLongRunningRequest,
    ) -> Result<Operation, GenAiError> {
        tracing::info!(model = model, "Submitting video generation job");
        let url = self.model_endpoint(model, "predictLongRunning");
        self.send_json(self.http_client.post(&url).json(request)).await
    }

    async fn get_operation(&self, name: &str) -> Result<Operation, GenAiError> {
        let url = self.operation_endpoint(name);
        self.send_json(self.http_client.get(&url)).await
    }

    async fn download(&self, uri: &str) -> Result<DownloadedMedia, GenAiError> {
        tracing::info!("Downloading generated video");
        let response = self.send(self.http_client.get(uri)).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_VIDEO_CONTENT_TYPE)
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(network_error)?;

        tracing::debug!(bytes = bytes.len(), content_type = %content_type, "Video downloaded");
        Ok(DownloadedMedia {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
