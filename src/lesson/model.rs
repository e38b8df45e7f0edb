//! # Lesson Data Model
//!
//! The three records one lesson round produces. All of them are immutable once
//! built: a round creates a [`LessonPrompt`], evaluation creates a [`Feedback`],
//! and the two are moved into a [`HistoryItem`].
//!
//! JSON field names are camelCase because that is what the browser reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How hard the scene and the grading should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(format!("Unknown difficulty level: {}", s)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        };
        write!(f, "{}", name)
    }
}

/// The kind of media shown to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            _ => Err(format!("Unknown media kind: {}", s)),
        }
    }
}

/// The scene a learner is asked to describe.
///
/// `resource_locator` is a data URI (images), a local media URL (videos), or
/// the empty string when the service produced no image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPrompt {
    pub id: Uuid,
    pub media_kind: MediaKind,
    pub resource_locator: String,
    pub description: String,
    pub topic: String,
    pub difficulty: Difficulty,
}

impl LessonPrompt {
    pub fn has_media(&self) -> bool {
        !self.resource_locator.is_empty()
    }
}

/// One corrected fragment of the learner's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub original: String,
    pub correction: String,
    pub explanation: String,
}

/// The evaluation of one submission. `score` is always within 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub score: u8,
    pub corrections: Vec<Correction>,
    pub vocabulary_suggestions: Vec<String>,
    pub overall_comment: String,
    pub model_sample_description: String,
}

/// A finished round: the prompt, what the learner wrote, and the feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: Uuid,
    pub prompt: LessonPrompt,
    pub user_text: String,
    pub feedback: Feedback,
    pub created_at: DateTime<Utc>,
}

impl HistoryItem {
    /// Takes ownership of an already finalized prompt and feedback.
    pub fn new(prompt: LessonPrompt, user_text: String, feedback: Feedback) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt,
            user_text,
            feedback,
            created_at: Utc::now(),
        }
    }
}
