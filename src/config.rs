//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix, `__` between nesting levels)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Converts between Rust structs and TOML/JSON/environment values
//! - **#[serde(skip_serializing)]**: Keeps the API key out of anything we serialize
//! - **impl Default**: Documents every setting's starting value in one place
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Special environment variables (HOST, PORT, GEMINI_API_KEY, API_KEY)
//! 2. Prefixed environment variables (APP_SERVER__PORT, APP_VIDEO__POLL_INTERVAL_SECS, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use crate::audio::buffer::MAX_CHANNELS;
use crate::audio::PcmFormat;
use crate::genai::requests::VideoSettings;
use crate::genai::OperationPoller;
use crate::lesson::service::StoreLimits;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Settings read once at startup (HTTP server, client, audio context, stores).
/// `PUT /api/v1/config` refuses to change them.
pub const STARTUP_ONLY_KEYS: &[&str] = &[
    "server.host",
    "server.port",
    "genai.base_url",
    "genai.request_timeout_secs",
    "audio.sample_rate",
    "audio.channels",
    "performance.max_open_lessons",
    "performance.max_stored_media",
];

/// Environment variables checked for the service credential, in order.
const CREDENTIAL_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Each section maps to one concern (HTTP server, AI service, video jobs,
/// speech audio, API limits), which keeps `config.toml` readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub genai: GenAiConfig,
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub performance: PerformanceConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Generative AI service settings.
///
/// ## Fields:
/// - `base_url`: REST root, e.g. `https://generativelanguage.googleapis.com/v1beta`
/// - `api_key`: Service credential. Empty is allowed; the service rejects calls per request
/// - `*_model`: Model identifier for each kind of call
/// - `voice`: Prebuilt voice used for speech synthesis
/// - `image_aspect_ratio`: Aspect ratio requested for scene images
/// - `request_timeout_secs`: Per-HTTP-request timeout (not the video job timeout)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenAiConfig {
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    pub text_model: String,
    pub image_model: String,
    pub video_model: String,
    pub tts_model: String,
    pub voice: String,
    pub image_aspect_ratio: String,
    pub request_timeout_secs: u64,
}

/// Long-running video job settings.
///
/// ## Fields:
/// - `poll_interval_secs`: Delay before each status check (10s)
/// - `poll_timeout_secs`: Give up after this long; `0` waits indefinitely
/// - `resolution` / `aspect_ratio`: Fixed output shape of the generated video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
    pub resolution: String,
    pub aspect_ratio: String,
}

/// Format of the raw PCM16 speech returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Limits on what the API hands back and what the process keeps in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum number of history items returned by `GET /api/v1/history`
    pub history_limit: usize,
    /// Lessons started but not yet evaluated; the oldest is dropped past this
    pub max_open_lessons: usize,
    /// Downloaded videos kept for `/api/v1/media`; the oldest is dropped past this
    pub max_stored_media: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            genai: GenAiConfig {
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                api_key: String::new(),
                text_model: "gemini-2.5-flash".to_string(),
                image_model: "gemini-2.5-flash-image".to_string(),
                video_model: "veo-3.1-fast-generate-preview".to_string(),
                tts_model: "gemini-2.5-flash-preview-tts".to_string(),
                voice: "Kore".to_string(),
                image_aspect_ratio: "16:9".to_string(),
                request_timeout_secs: 120,
            },
            video: VideoConfig {
                poll_interval_secs: 10,
                poll_timeout_secs: 600,
                resolution: "720p".to_string(),
                aspect_ratio: "16:9".to_string(),
            },
            audio: AudioConfig {
                sample_rate: 24000,  // Speech models return 24kHz mono
                channels: 1,
            },
            performance: PerformanceConfig {
                history_limit: 100,
                max_open_lessons: 20,
                max_stored_media: 10,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_GENAI__TEXT_MODEL=gemini-2.5-pro`: Override the text model
    /// - `APP_VIDEO__POLL_TIMEOUT_SECS=0`: Disable the video job timeout
    /// - `GEMINI_API_KEY=...`: Service credential (`API_KEY` is also accepted)
    /// - `HOST` / `PORT`: Special cases for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Some(key) = credential_from_env() {
            settings = settings.set_override("genai.api_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Every model id and the base URL are non-empty
    /// - Poll interval, audio format and history limit are positive
    ///
    /// An empty API key is not an error here.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.genai.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("Generative AI base URL cannot be empty"));
        }

        for (name, value) in [
            ("text_model", &self.genai.text_model),
            ("image_model", &self.genai.image_model),
            ("video_model", &self.genai.video_model),
            ("tts_model", &self.genai.tts_model),
            ("voice", &self.genai.voice),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow::anyhow!("genai.{} cannot be empty", name));
            }
        }

        if self.genai.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout must be greater than 0"));
        }

        if self.video.poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("Video poll interval must be greater than 0"));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow::anyhow!("Audio sample rate must be greater than 0"));
        }

        if self.audio.channels == 0 || self.audio.channels > MAX_CHANNELS {
            return Err(anyhow::anyhow!("Audio channel count must be between 1 and {}", MAX_CHANNELS));
        }

        if self.performance.history_limit == 0 {
            return Err(anyhow::anyhow!("History limit must be greater than 0"));
        }

        if self.performance.max_open_lessons == 0 || self.performance.max_stored_media == 0 {
            return Err(anyhow::anyhow!("Open lesson and stored media limits must be greater than 0"));
        }

        Ok(())
    }

    /// Update configuration from a JSON string (used for runtime config updates).
    ///
    /// ## Partial updates:
    /// Only fields present in the JSON change. Sending
    /// `{"genai": {"api_key": "..."}}` is how the browser re-selects a
    /// credential after the service rejected the old one.
    ///
    /// Keys in [`STARTUP_ONLY_KEYS`] are rejected: they are read once when the
    /// server starts, so accepting them here would silently do nothing.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        let rejected: Vec<&str> = STARTUP_ONLY_KEYS
            .iter()
            .copied()
            .filter(|key| {
                let (section, field) = key.split_once('.').unwrap_or((*key, ""));
                partial_config.get(section).and_then(|s| s.get(field)).is_some()
            })
            .collect();
        if !rejected.is_empty() {
            return Err(anyhow::anyhow!(
                "These settings only take effect at startup: {}",
                rejected.join(", ")
            ));
        }

        if let Some(genai) = partial_config.get("genai") {
            let text_fields: [(&str, &mut String); 7] = [
                ("api_key", &mut self.genai.api_key),
                ("text_model", &mut self.genai.text_model),
                ("image_model", &mut self.genai.image_model),
                ("video_model", &mut self.genai.video_model),
                ("tts_model", &mut self.genai.tts_model),
                ("voice", &mut self.genai.voice),
                ("image_aspect_ratio", &mut self.genai.image_aspect_ratio),
            ];
            for (key, slot) in text_fields {
                if let Some(value) = genai.get(key).and_then(|v| v.as_str()) {
                    *slot = value.to_string();
                }
            }
        }

        if let Some(video) = partial_config.get("video") {
            if let Some(interval) = video.get("poll_interval_secs").and_then(|v| v.as_u64()) {
                self.video.poll_interval_secs = interval;
            }
            if let Some(timeout) = video.get("poll_timeout_secs").and_then(|v| v.as_u64()) {
                self.video.poll_timeout_secs = timeout;
            }
            if let Some(resolution) = video.get("resolution").and_then(|v| v.as_str()) {
                self.video.resolution = resolution.to_string();
            }
            if let Some(aspect_ratio) = video.get("aspect_ratio").and_then(|v| v.as_str()) {
                self.video.aspect_ratio = aspect_ratio.to_string();
            }
        }

        if let Some(performance) = partial_config.get("performance") {
            if let Some(limit) = performance.get("history_limit").and_then(|v| v.as_u64()) {
                self.performance.history_limit = limit as usize;
            }
        }

        self.validate()?;
        Ok(())
    }

    pub fn store_limits(&self) -> StoreLimits {
        StoreLimits {
            open_lessons: self.performance.max_open_lessons,
            stored_media: self.performance.max_stored_media,
        }
    }

    /// Poller for video jobs, built from the `video` section.
    pub fn video_poller(&self) -> OperationPoller {
        let timeout = match self.video.poll_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        OperationPoller::new(Duration::from_secs(self.video.poll_interval_secs), timeout)
    }

    pub fn video_settings(&self) -> VideoSettings {
        VideoSettings {
            resolution: self.video.resolution.clone(),
            aspect_ratio: self.video.aspect_ratio.clone(),
        }
    }

    pub fn speech_format(&self) -> PcmFormat {
        PcmFormat::new(self.audio.sample_rate, self.audio.channels)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.genai.request_timeout_secs)
    }
}

/// First non-empty credential variable from the process environment.
fn credential_from_env() -> Option<String> {
    CREDENTIAL_ENV_VARS
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}
