//! # Lesson Module
//!
//! The tutoring workflow: scene prompts, evaluation, and the session history.
//!
//! ## Key Components:
//! - **Model**: `LessonPrompt`, `Feedback`, `HistoryItem`
//! - **Prompts**: Scene and evaluation prompt text, business-analysis rubric, fallback scene
//! - **Evaluation**: Typed validation of the structured evaluation response
//! - **History**: Most-recent-first, in-memory list of finished rounds
//! - **Media**: Local store for downloaded videos
//! - **Store**: Capacity-bounded map behind open lessons and stored media
//! - **Service**: `TutorService`, which runs a round end to end

pub mod evaluation;   // Structured response validation
pub mod history;      // Session history
pub mod media;        // Downloaded video store
pub mod model;        // Lesson records
pub mod prompts;      // Prompt construction
pub mod service;      // Round orchestration
pub mod store;        // Capacity-bounded keyed store

pub use model::{Difficulty, MediaKind};
pub use service::{TutorError, TutorService};
