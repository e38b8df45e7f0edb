//! # Evaluation Response Validation
//!
//! The evaluation call asks the service for JSON matching [`feedback_schema`].
//! The service usually complies, but nothing guarantees it, so the text is run
//! through [`parse_feedback`] which either yields a complete [`Feedback`] or
//! says exactly what was wrong.
//!
//! ## Validation Rules:
//! - **Malformed**: Not JSON, or a field has the wrong JSON type
//! - **MissingField**: Any required field (or correction sub-field) absent or null
//! - **ScoreOutOfRange**: Score not a finite number within 0..=100
//!
//! Empty arrays and empty strings are accepted; only absence is an error.

use crate::lesson::model::{Correction, Feedback};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FeedbackError {
    #[error("Evaluation response is not valid JSON: {0}")]
    Malformed(String),

    #[error("Evaluation response is missing required field '{0}'")]
    MissingField(String),

    #[error("Evaluation score {0} is outside 0-100")]
    ScoreOutOfRange(f64),
}

/// Response schema sent with the evaluation request.
pub fn feedback_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": {
                "type": "NUMBER",
                "description": "Overall score from 0 to 100"
            },
            "corrections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "original": { "type": "STRING" },
                        "correction": { "type": "STRING" },
                        "explanation": { "type": "STRING" }
                    },
                    "required": ["original", "correction", "explanation"]
                }
            },
            "vocabularySuggestions": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "At least 5 words or phrases"
            },
            "overallComment": { "type": "STRING" },
            "modelSampleDescription": {
                "type": "STRING",
                "description": "Polished description of the scene, 150 to 300 words"
            }
        },
        "required": [
            "score",
            "corrections",
            "vocabularySuggestions",
            "overallComment",
            "modelSampleDescription"
        ]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeedback {
    score: Option<f64>,
    corrections: Option<Vec<RawCorrection>>,
    vocabulary_suggestions: Option<Vec<String>>,
    overall_comment: Option<String>,
    model_sample_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCorrection {
    original: Option<String>,
    correction: Option<String>,
    explanation: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, FeedbackError> {
    value.ok_or_else(|| FeedbackError::MissingField(field.to_string()))
}

/// Drop a surrounding markdown code fence, if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Validate the evaluation text and build a [`Feedback`].
pub fn parse_feedback(text: &str) -> Result<Feedback, FeedbackError> {
    let raw: RawFeedback = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| FeedbackError::Malformed(e.to_string()))?;

    let score = required(raw.score, "score")?;
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(FeedbackError::ScoreOutOfRange(score));
    }

    let corrections = required(raw.corrections, "corrections")?
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            Ok(Correction {
                original: required(c.original, &format!("corrections[{}].original", i))?,
                correction: required(c.correction, &format!("corrections[{}].correction", i))?,
                explanation: required(c.explanation, &format!("corrections[{}].explanation", i))?,
            })
        })
        .collect::<Result<Vec<_>, FeedbackError>>()?;

    let vocabulary_suggestions = required(raw.vocabulary_suggestions, "vocabularySuggestions")?;
    if vocabulary_suggestions.len() < 5 {
        tracing::debug!(count = vocabulary_suggestions.len(), "Fewer vocabulary suggestions than requested");
    }

    Ok(Feedback {
        score: score.round() as u8,
        corrections,
        vocabulary_suggestions,
        overall_comment: required(raw.overall_comment, "overallComment")?,
        model_sample_description: required(raw.model_sample_description, "modelSampleDescription")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn complete() -> Value {
        json!({
            "score": 72.4,
            "corrections": [
                {"original": "There is bus red", "correction": "There is a red bus", "explanation": "Adjectives come before the noun."}
            ],
            "vocabularySuggestions": ["bustling", "pedestrians", "crosswalk", "storefront", "double-decker"],
            "overallComment": "Good effort.",
            "modelSampleDescription": "A red double-decker bus waits at a crosswalk..."
        })
    }

    #[test]
    fn test_complete_response() {
        let feedback = parse_feedback(&complete().to_string()).unwrap();
        assert_eq!(feedback.score, 72);
        assert_eq!(feedback.corrections.len(), 1);
        assert_eq!(feedback.corrections[0].correction, "There is a red bus");
        assert_eq!(feedback.vocabulary_suggestions.len(), 5);
    }

    #[test]
    fn test_each_missing_field_is_reported() {
        for field in [
            "score",
            "corrections",
            "vocabularySuggestions",
            "overallComment",
            "modelSampleDescription",
        ] {
            let mut value = complete();
            value.as_object_mut().unwrap().remove(field);
            assert_eq!(
                parse_feedback(&value.to_string()),
                Err(FeedbackError::MissingField(field.to_string())),
                "field {}",
                field
            );
        }
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut value = complete();
        value["overallComment"] = Value::Null;
        assert_eq!(
            parse_feedback(&value.to_string()),
            Err(FeedbackError::MissingField("overallComment".to_string()))
        );
    }

    #[test]
    fn test_missing_correction_subfield() {
        for field in ["original", "correction", "explanation"] {
            let mut value = complete();
            value["corrections"][0].as_object_mut().unwrap().remove(field);
            assert_eq!(
                parse_feedback(&value.to_string()),
                Err(FeedbackError::MissingField(format!("corrections[0].{}", field)))
            );
        }
    }

    #[test]
    fn test_malformed_responses() {
        assert!(matches!(parse_feedback("Sorry, I can't do that."), Err(FeedbackError::Malformed(_))));
        assert!(matches!(parse_feedback(""), Err(FeedbackError::Malformed(_))));

        let mut value = complete();
        value["score"] = json!("high");
        assert!(matches!(parse_feedback(&value.to_string()), Err(FeedbackError::Malformed(_))));
    }

    #[test]
    fn test_empty_object_reports_first_missing_field() {
        assert_eq!(parse_feedback("{}"), Err(FeedbackError::MissingField("score".to_string())));
    }

    #[test]
    fn test_score_bounds() {
        for (score, ok) in [(0.0, true), (100.0, true), (-1.0, false), (100.5, false)] {
            let mut value = complete();
            value["score"] = json!(score);
            assert_eq!(parse_feedback(&value.to_string()).is_ok(), ok, "score {}", score);
        }
    }

    #[test]
    fn test_code_fence_is_tolerated() {
        let text = format!("```json\n{}\n```", complete());
        assert_eq!(parse_feedback(&text).unwrap().score, 72);
    }

    #[test]
    fn test_empty_lists_are_accepted() {
        let mut value = complete();
        value["corrections"] = json!([]);
        value["vocabularySuggestions"] = json!([]);
        let feedback = parse_feedback(&value.to_string()).unwrap();
        assert!(feedback.corrections.is_empty());
        assert!(feedback.vocabulary_suggestions.is_empty());
    }
}
