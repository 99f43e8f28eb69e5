// src/services/quizzes.rs

use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{QuestionDraft, Quiz, QuizResult},
    quiz::QuizSession,
    store::{Collection, Filter, Order, Query, RecordStore, decode_row, decode_rows},
};

/// Assembles a quiz locally before publishing it in one go:
/// first the quiz row, then its questions in bulk.
pub struct QuizBuilder {
    title: String,
    questions: Vec<QuestionDraft>,
}

impl QuizBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            questions: Vec::new(),
        }
    }

    /// Add a draft question: non-empty text, exactly 4 non-empty options,
    /// correct index in 1..=4.
    pub fn add_question(&mut self, draft: QuestionDraft) -> Result<(), AppError> {
        draft.validate()?;

        self.questions.push(QuestionDraft {
            question_text: draft.question_text.trim().to_string(),
            options: draft.options.iter().map(|o| o.trim().to_string()).collect(),
            correct: draft.correct,
        });
        Ok(())
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Publish the quiz. Consumes the builder; a published quiz is
    /// immutable.
    pub async fn publish(self, store: &dyn RecordStore) -> Result<Quiz, AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::ValidationFailed("Quiz title required".to_string()));
        }
        if self.questions.is_empty() {
            return Err(AppError::ValidationFailed(
                "Add at least one question".to_string(),
            ));
        }

        let user = store.current_user().await;
        let row = store
            .insert(
                Collection::Quizzes,
                json!({
                    "title": title,
                    "created_by": user.map(|u| u.id),
                }),
            )
            .await
            .map_err(|e| {
                tracing::error!("Quiz create error: {}", e);
                e
            })?;
        let quiz: Quiz = decode_row(Collection::Quizzes, row)?;

        // Options are stored JSON-encoded inside a text column; the reader
        // side accepts both that and a native array.
        let inserts = self
            .questions
            .iter()
            .map(|q| {
                Ok(json!({
                    "quiz_id": quiz.id,
                    "question_text": q.question_text,
                    "options": serde_json::to_string(&q.options).map_err(|e| {
                        AppError::ValidationFailed(format!("options not serializable: {}", e))
                    })?,
                    "correct": q.correct,
                }))
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        store
            .insert_many(Collection::QuizQuestions, inserts)
            .await
            .map_err(|e| {
                tracing::error!("Questions insert error: {}", e);
                e
            })?;

        tracing::info!("Quiz '{}' published with {} questions", quiz.title, self.questions.len());
        Ok(quiz)
    }
}

/// What a guard opening the quiz view gets.
pub enum LatestQuiz {
    /// No quiz has been published. "No quizzes available."
    None,

    /// The latest quiz has no questions. "No question found."
    NoQuestions(Quiz),

    /// A running session over the latest quiz.
    Ready(QuizSession),
}

/// Load the most recently created quiz and start a session over its
/// questions, ordered ascending by question id (a deterministic tie-break,
/// not a guarantee of authored order).
pub async fn start_latest_quiz(store: &dyn RecordStore) -> Result<LatestQuiz, AppError> {
    let rows = store
        .fetch(
            Collection::Quizzes,
            Query::new().order(Order::desc("created_at")).limit(1),
        )
        .await?;
    let Some(quiz) = decode_rows::<Quiz>(Collection::Quizzes, rows)?.pop() else {
        return Ok(LatestQuiz::None);
    };

    let rows = store
        .fetch(
            Collection::QuizQuestions,
            Query::new()
                .filter(Filter::Eq("quiz_id", json!(quiz.id)))
                .order(Order::asc("id")),
        )
        .await?;
    let questions = decode_rows(Collection::QuizQuestions, rows)?;

    if questions.is_empty() {
        return Ok(LatestQuiz::NoQuestions(quiz));
    }
    Ok(LatestQuiz::Ready(QuizSession::new(quiz, questions)?))
}

/// Persist the frozen outcome of a submitted session as a Quiz Result.
///
/// Exactly one write per session: `Ok(None)` means the result was already
/// recorded. A rejected write releases the claim so the caller may retry
/// manually; the local outcome is unaffected either way.
pub async fn record_result(
    store: &dyn RecordStore,
    session: &mut QuizSession,
) -> Result<Option<QuizResult>, AppError> {
    if !session.is_submitted() {
        return Err(AppError::ValidationFailed(
            "the quiz has not been submitted yet".to_string(),
        ));
    }

    let Some(outcome) = session.begin_recording() else {
        return Ok(None);
    };

    let user = store.current_user().await;
    let insert = store
        .insert(
            Collection::QuizResults,
            json!({
                "user_id": user.map(|u| u.id),
                "quiz_id": session.quiz().id,
                "score": outcome.score,
                "total": outcome.total,
            }),
        )
        .await;

    match insert {
        Ok(row) => Ok(Some(decode_row(Collection::QuizResults, row)?)),
        Err(e) => {
            session.recording_failed();
            tracing::error!("Failed to persist quiz result: {}", e);
            Err(e)
        }
    }
}
