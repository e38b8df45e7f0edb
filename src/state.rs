//! # Application State Management
//!
//! Shared state handed to every HTTP handler through `web::Data<AppState>`.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc<RwLock<T>> Pattern
//! - **Arc**: Multiple ownership (many HTTP handlers can hold a reference)
//! - **RwLock**: Multiple readers OR one writer
//! - **T**: The actual data type being protected
//!
//! ### Trait objects
//! - **Arc<dyn GenAiBackend>**: The tutor talks to the service through a trait,
//!   so tests can swap the HTTP client for a scripted one
//!
//! ## Lock poisoning:
//! A handler that panics while holding a lock poisons it. The config and the
//! counters stay usable afterwards, so poisoned guards are recovered with
//! `PoisonError::into_inner` instead of propagating the panic.

use crate::audio::AudioContextHandle;
use crate::config::AppConfig;
use crate::genai::{ApiCredential, GenAiBackend, GeminiClient};
use crate::lesson::TutorService;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::info;

/// The main application state that's shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Request metrics, updated by the metrics middleware
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,

    /// Lesson rounds, history, media and speech
    pub tutor: Arc<TutorService>,

    /// Service credential shared with the HTTP client
    pub credential: ApiCredential,
}

/// Request metrics collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,

    /// Lesson rounds started successfully
    pub lessons_started: u64,

    /// Descriptions evaluated successfully
    pub evaluations_completed: u64,

    /// Key: route pattern (e.g., "POST /api/v1/lessons/{id}/evaluate")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Per-endpoint metrics.
///
/// - **Average response time**: total_duration_ms / request_count
/// - **Error rate**: error_count / request_count
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Build the state with the HTTP-backed service client.
    ///
    /// Fails only if the HTTP client cannot be constructed (TLS setup).
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let credential = ApiCredential::new(config.genai.api_key.clone());
        let client = GeminiClient::new(&config.genai.base_url, credential.clone(), config.request_timeout())?;
        info!(base_url = %config.genai.base_url, "Generative AI client ready");
        Ok(Self::with_backend(config, Arc::new(client), credential))
    }

    /// Build the state around any backend. `credential` should be the one the
    /// backend reads from, so config updates reach it.
    pub fn with_backend(config: AppConfig, backend: Arc<dyn GenAiBackend>, credential: ApiCredential) -> Self {
        let audio = AudioContextHandle::new(config.speech_format());
        let limits = config.store_limits();
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            tutor: Arc::new(TutorService::new(backend, audio, limits)),
            credential,
        }
    }

    /// Copy of the current configuration. Cloning releases the lock at once.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Validate and swap in a new configuration.
    ///
    /// A changed API key takes effect on the next service call. Settings in
    /// [`crate::config::STARTUP_ONLY_KEYS`] are refused before they get here.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        new_config.validate().map_err(|e| e.to_string())?;

        if new_config.genai.api_key != self.credential.get() {
            info!(configured = !new_config.genai.api_key.is_empty(), "Service credential updated");
            self.credential.set(new_config.genai.api_key.clone());
        }
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = new_config;
        Ok(())
    }

    fn with_metrics<R>(&self, f: impl FnOnce(&mut AppMetrics) -> R) -> R {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut metrics)
    }

    pub fn increment_request_count(&self) {
        self.with_metrics(|m| m.request_count += 1);
    }

    pub fn increment_error_count(&self) {
        self.with_metrics(|m| m.error_count += 1);
    }

    pub fn record_lesson_started(&self) {
        self.with_metrics(|m| m.lessons_started += 1);
    }

    pub fn record_evaluation(&self) {
        self.with_metrics(|m| m.evaluations_completed += 1);
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        self.with_metrics(|m| {
            let endpoint_metric = m.endpoint_metrics.entry(endpoint.to_string()).or_default();
            endpoint_metric.request_count += 1;
            endpoint_metric.total_duration_ms += duration_ms;
            if is_error {
                endpoint_metric.error_count += 1;
            }
        });
    }

    /// Consistent copy of the metrics, taken under one read lock.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            lessons_started: metrics.lessons_started,
            evaluations_completed: metrics.evaluations_completed,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Cancel pending video waits and close the audio context.
    pub fn shutdown(&self) {
        self.tutor.shutdown();
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Fraction of failed requests, 0.0 to 1.0.
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::testing::ScriptedBackend;

    fn state() -> AppState {
        AppState::with_backend(AppConfig::default(), Arc::new(ScriptedBackend::new()), ApiCredential::default())
    }

    #[test]
    fn test_update_config_propagates_credential() {
        let state = state();
        let mut config = state.get_config();
        config.genai.api_key = "new-key".to_string();

        state.update_config(config).unwrap();
        assert_eq!(state.credential.get(), "new-key");
        assert_eq!(state.get_config().genai.api_key, "new-key");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let state = state();
        let mut config = state.get_config();
        config.video.poll_interval_secs = 0;
        config.genai.api_key = "ignored".to_string();

        assert!(state.update_config(config).is_err());
        assert!(state.credential.is_empty());
        assert_eq!(state.get_config().video.poll_interval_secs, 10);
    }

    #[test]
    fn test_endpoint_metrics() {
        let state = state();
        state.record_endpoint_request("GET /api/v1/history", 10, false);
        state.record_endpoint_request("GET /api/v1/history", 30, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["GET /api/v1/history"];
        assert_eq!(metric.average_duration_ms(), 20.0);
        assert_eq!(metric.error_rate(), 0.5);
    }

    #[tokio::test]
    async fn test_shutdown_closes_audio() {
        let state = state();
        assert!(state.tutor.audio().get_or_create().is_some());
        state.shutdown();
        assert!(!state.tutor.audio().is_open());
    }
}
