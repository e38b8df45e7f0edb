//! # Lesson REST API Handlers
//!
//! ## Available Endpoints:
//! - `POST /api/v1/lessons` - Generate a scene and its media
//! - `POST /api/v1/lessons/{id}/evaluate` - Score the learner's description
//! - `GET /api/v1/history` - Finished rounds, most recent first
//! - `GET /api/v1/media/{id}` - A downloaded video
//! - `GET /api/v1/status` - Whether a generation chain is running

use crate::lesson::{Difficulty, MediaKind};
use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonRequest {
    pub topic: String,
    pub difficulty: String,
    /// Defaults to an image round.
    pub media_kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Start a lesson round.
///
/// ## Endpoint: `POST /api/v1/lessons`
///
/// ## Request:
/// ```json
/// { "topic": "Travel", "difficulty": "beginner", "mediaKind": "video" }
/// ```
///
/// Video rounds hold the request open until the job finishes (minutes).
pub async fn create_lesson(
    state: web::Data<AppState>,
    body: web::Json<CreateLessonRequest>,
) -> Result<HttpResponse, AppError> {
    let difficulty: Difficulty = body.difficulty.parse().map_err(AppError::ValidationError)?;
    let media_kind: MediaKind = match &body.media_kind {
        Some(kind) => kind.parse().map_err(AppError::ValidationError)?,
        None => MediaKind::Image,
    };

    let config = state.get_config();
    let prompt = state
        .tutor
        .start_lesson(&config, &body.topic, difficulty, media_kind)
        .await?;
    state.record_lesson_started();

    Ok(HttpResponse::Created().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "lesson": prompt,
        "hasMedia": prompt.has_media()
    })))
}

/// Evaluate a description against an open lesson.
///
/// ## Endpoint: `POST /api/v1/lessons/{id}/evaluate`
pub async fn evaluate_lesson(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<EvaluateRequest>,
) -> Result<HttpResponse, AppError> {
    let config = state.get_config();
    let item = state
        .tutor
        .submit_description(&config, path.into_inner(), &body.text)
        .await?;
    state.record_evaluation();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "result": item
    })))
}

pub async fn get_history(
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let max = state.get_config().performance.history_limit;
    let limit = query.limit.unwrap_or(max).min(max);
    let items = state.tutor.history().recent(limit).await;

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "total": state.tutor.history().len().await,
        "items": items
    })))
}

pub async fn get_media(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let media = state
        .tutor
        .media()
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Media {} not found", id)))?;

    Ok(HttpResponse::Ok()
        .content_type(media.content_type)
        .body(media.bytes.to_vec()))
}

pub async fn get_status(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "loading": state.tutor.is_loading(),
        "openLessons": state.tutor.open_lesson_count().await,
        "historyCount": state.tutor.history().len().await,
        "credentialConfigured": !state.credential.is_empty()
    })))
}
