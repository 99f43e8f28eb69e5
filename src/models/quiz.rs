// src/models/quiz.rs

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Represents the 'quizzes' collection. Immutable after publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub created_by: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'quiz_questions' collection.
///
/// Invariants: `options` always has exactly 4 entries and `correct` is a
/// 1-based index into them. Created in bulk at publish time, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,

    /// Historically stored as a JSON-encoded string rather than a native
    /// array, so deserialization accepts both encodings.
    #[serde(deserialize_with = "options_from_value")]
    pub options: Vec<String>,

    /// 1-based index of the correct option.
    pub correct: u8,
}

fn options_from_value<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawOptions {
        List(Vec<String>),
        Encoded(String),
    }

    match RawOptions::deserialize(deserializer)? {
        RawOptions::List(options) => Ok(options),
        RawOptions::Encoded(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
    }
}

/// Represents the 'quiz_results' collection: one row per completed quiz
/// session, written exactly once and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: i64,

    /// Null when no session user was known at submission time; an absent
    /// session must never block the write.
    pub user_id: Option<String>,

    pub quiz_id: i64,
    pub score: u32,
    pub total: u32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for a question while the admin is still assembling the quiz.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuestionDraft {
    #[validate(length(min = 1, max = 2000, message = "Question text required"))]
    pub question_text: String,

    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,

    #[validate(range(min = 1, max = 4, message = "Correct option must be 1-4"))]
    pub correct: u8,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != 4 {
        return Err(validator::ValidationError::new("exactly_4_options_required"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("all_4_options_required"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
