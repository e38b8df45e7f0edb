//! # Speech REST API Handlers
//!
//! ## Available Endpoints:
//! - `POST /api/v1/speech` - Synthesize text; returns the raw payload plus the
//!   decoded buffer's shape (and samples, if asked for)
//! - `POST /api/v1/speech/wav` - Synthesize text and return a playable WAV file

use crate::audio::processor::render_wav;
use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    pub text: String,
    /// Include the decoded per-channel samples in the response.
    #[serde(default)]
    pub include_samples: bool,
}

pub async fn synthesize_speech(
    state: web::Data<AppState>,
    body: web::Json<SpeechRequest>,
) -> Result<HttpResponse, AppError> {
    let config = state.get_config();
    let clip = state.tutor.speak(&config, &body.text).await?;
    let buffer = &clip.buffer;

    let mut response = json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "audioBase64": clip.audio_base64,
        "sampleRate": buffer.sample_rate(),
        "channels": buffer.channels(),
        "frameCount": buffer.frame_count(),
        "durationSeconds": buffer.duration_seconds()
    });
    if body.include_samples {
        response["buffer"] = serde_json::to_value(buffer)?;
    }

    Ok(HttpResponse::Ok().json(response))
}

pub async fn synthesize_speech_wav(
    state: web::Data<AppState>,
    body: web::Json<SpeechRequest>,
) -> Result<HttpResponse, AppError> {
    let config = state.get_config();
    let clip = state.tutor.speak(&config, &body.text).await?;

    Ok(HttpResponse::Ok()
        .content_type("audio/wav")
        .body(render_wav(&clip.buffer)))
}
