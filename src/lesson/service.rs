//! # Tutor Service
//!
//! Runs lesson rounds against a [`GenAiBackend`]. One round is:
//!
//! 1. **Scene**: Generate a description for the topic/difficulty (fallback if empty)
//! 2. **Media**: Generate an image, or submit a video job and poll it to completion
//! 3. **Learner input**: The browser collects the learner's description
//! 4. **Evaluation**: Score the description and append the result to history
//!
//! Steps within a round run strictly one after another. Across rounds, only one
//! generation chain may be in flight at a time; a second request while one is
//! running gets [`TutorError::Busy`]. Speech synthesis is not part of a round
//! and is not subject to that limit.

use crate::audio::{AudioBuffer, AudioContextHandle, DecodeError};
use crate::config::AppConfig;
use crate::genai::requests;
use crate::genai::{GenAiBackend, GenAiError};
use crate::lesson::evaluation::{feedback_schema, parse_feedback, FeedbackError};
use crate::lesson::history::HistoryLog;
use crate::lesson::media::MediaStore;
use crate::lesson::model::{Difficulty, HistoryItem, LessonPrompt, MediaKind};
use crate::lesson::prompts;
use crate::lesson::store::BoundedStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TutorError {
    #[error(transparent)]
    GenAi(#[from] GenAiError),

    #[error(transparent)]
    Feedback(#[from] FeedbackError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Lesson {0} not found")]
    LessonNotFound(Uuid),

    #[error("{0} cannot be empty")]
    EmptyText(&'static str),

    #[error("Another lesson request is already in progress")]
    Busy,

    #[error("Audio output has been shut down")]
    AudioClosed,

    #[error("Background task failed: {0}")]
    Worker(String),
}

/// Synthesized speech: the raw payload and its decoded buffer.
#[derive(Debug, Clone)]
pub struct SpeechClip {
    pub audio_base64: String,
    pub buffer: AudioBuffer,
}

/// How many open lessons and stored videos the service keeps in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub open_lessons: usize,
    pub stored_media: usize,
}

/// Clears the in-flight flag when dropped, whether the round succeeded or not.
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct TutorService {
    backend: Arc<dyn GenAiBackend>,
    media: MediaStore,
    history: HistoryLog,
    lessons: RwLock<BoundedStore<LessonPrompt>>,
    audio: AudioContextHandle,
    loading: AtomicBool,
    shutdown: CancellationToken,
}

impl TutorService {
    pub fn new(backend: Arc<dyn GenAiBackend>, audio: AudioContextHandle, limits: StoreLimits) -> Self {
        Self {
            backend,
            media: MediaStore::new(limits.stored_media),
            history: HistoryLog::new(),
            lessons: RwLock::new(BoundedStore::new(limits.open_lessons)),
            audio,
            loading: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    fn begin(&self) -> Result<InFlight<'_>, TutorError> {
        self.loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| TutorError::Busy)?;
        Ok(InFlight { flag: &self.loading })
    }

    /// Whether a generation chain is currently running.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn audio(&self) -> &AudioContextHandle {
        &self.audio
    }

    pub async fn open_lesson_count(&self) -> usize {
        self.lessons.read().await.len()
    }

    pub async fn lesson(&self, id: &Uuid) -> Option<LessonPrompt> {
        self.lessons.read().await.get(id).cloned()
    }

    /// Generate the scene and its media for a new round.
    pub async fn start_lesson(
        &self,
        config: &AppConfig,
        topic: &str,
        difficulty: Difficulty,
        media_kind: MediaKind,
    ) -> Result<LessonPrompt, TutorError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(TutorError::EmptyText("Topic"));
        }
        let _in_flight = self.begin()?;

        info!(topic = topic, difficulty = %difficulty, media_kind = ?media_kind, "Starting lesson");
        let description = self.generate_description(config, topic, difficulty).await?;

        let resource_locator = match media_kind {
            MediaKind::Image => self.generate_image(config, &description).await?,
            MediaKind::Video => self.generate_video(config, &description).await?,
        };
        if resource_locator.is_empty() {
            warn!(topic = topic, "Image generation returned no image");
        }

        let prompt = LessonPrompt {
            id: Uuid::new_v4(),
            media_kind,
            resource_locator,
            description,
            topic: topic.to_string(),
            difficulty,
        };
        if let Some(evicted) = self.lessons.write().await.insert(prompt.id, prompt.clone()) {
            info!(lesson_id = %evicted, "Dropped oldest open lesson");
        }

        info!(lesson_id = %prompt.id, "Lesson ready");
        Ok(prompt)
    }

    async fn generate_description(
        &self,
        config: &AppConfig,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<String, TutorError> {
        let request = requests::text_request(&prompts::scene_description_prompt(topic, difficulty));
        let response = self
            .backend
            .generate_content(&config.genai.text_model, &request)
            .await?;

        let generated = response.text();
        if generated.trim().is_empty() {
            warn!(topic = topic, "Scene description was empty, using fallback");
        }
        Ok(prompts::description_or_fallback(&generated))
    }

    /// Data URI of the generated image, or `""` when none was produced.
    async fn generate_image(&self, config: &AppConfig, description: &str) -> Result<String, TutorError> {
        let request = requests::image_request(description, &config.genai.image_aspect_ratio);
        let response = self
            .backend
            .generate_content(&config.genai.image_model, &request)
            .await?;
        Ok(requests::image_locator(&response))
    }

    /// Submit a video job, wait for it, and keep the downloaded file locally.
    /// Returns the local URL the video is served from.
    pub async fn generate_video(&self, config: &AppConfig, prompt: &str) -> Result<String, TutorError> {
        let request = requests::video_request(prompt, &config.video_settings());
        let handle = self
            .backend
            .submit_video(&config.genai.video_model, &request)
            .await?;
        info!(operation = %handle.name, "Video job submitted");

        let cancel = self.shutdown.child_token();
        let operation = config
            .video_poller()
            .wait(self.backend.as_ref(), handle, &cancel)
            .await?;

        let uri = operation.video_uri().ok_or(GenAiError::MissingVideo)?;
        let media = self.backend.download(uri).await?;
        Ok(self.media.insert(media).await)
    }

    /// Evaluate the learner's description and record the finished round.
    ///
    /// The lesson stays open if evaluation fails, so the learner can resubmit.
    pub async fn submit_description(
        &self,
        config: &AppConfig,
        lesson_id: Uuid,
        user_text: &str,
    ) -> Result<HistoryItem, TutorError> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(TutorError::EmptyText("Description"));
        }

        let prompt = self
            .lesson(&lesson_id)
            .await
            .ok_or(TutorError::LessonNotFound(lesson_id))?;
        let _in_flight = self.begin()?;

        let evaluation = prompts::evaluation_prompt(&prompt.description, user_text, prompt.difficulty, &prompt.topic);
        let request = requests::structured_request(&evaluation, feedback_schema());
        let response = self
            .backend
            .generate_content(&config.genai.text_model, &request)
            .await?;
        if let Some(reason) = response.block_reason() {
            return Err(GenAiError::Blocked(reason.to_string()).into());
        }
        let feedback = parse_feedback(&response.text())?;

        // A concurrent evaluation of the same lesson cannot get here: the
        // in-flight guard admits one chain at a time.
        self.lessons.write().await.remove(&lesson_id);

        info!(lesson_id = %lesson_id, score = feedback.score, "Description evaluated");
        let item = HistoryItem::new(prompt, user_text.to_string(), feedback);
        self.history.push(item.clone()).await;
        Ok(item)
    }

    /// Synthesize `text` and decode it through the shared audio context.
    pub async fn speak(&self, config: &AppConfig, text: &str) -> Result<SpeechClip, TutorError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TutorError::EmptyText("Text"));
        }
        let context = self.audio.get_or_create().ok_or(TutorError::AudioClosed)?;

        let request = requests::speech_request(text, &config.genai.voice);
        let response = self
            .backend
            .generate_content(&config.genai.tts_model, &request)
            .await?;
        if let Some(reason) = response.block_reason() {
            return Err(GenAiError::Blocked(reason.to_string()).into());
        }
        let audio_base64 = requests::speech_payload(&response)?;

        let payload = audio_base64.clone();
        let buffer = tokio::task::spawn_blocking(move || context.decode(&payload))
            .await
            .map_err(|e| TutorError::Worker(e.to_string()))??;

        Ok(SpeechClip { audio_base64, buffer })
    }

    /// Stop pending video polls and dispose of the audio context.
    pub fn shutdown(&self) {
        info!("Shutting down tutor service");
        self.shutdown.cancel();
        self.audio.close();
    }
}
