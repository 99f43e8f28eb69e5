// src/quiz.rs

use std::collections::HashMap;
use std::time::Duration;

use crate::error::AppError;
use crate::models::quiz::{Quiz, QuizQuestion};

/// Countdown budget per question.
pub const SECONDS_PER_QUESTION: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// The frozen result of a submitted session. Pure local state; persisting
/// it is a separate, fallible step (`services::quizzes::record_result`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    pub score: u32,
    pub total: u32,
}

/// One guard's run through a quiz under a time limit.
///
/// The session is owned by the single view that created it. It becomes
/// terminal exactly once, by explicit [`submit`](Self::submit) or by the
/// countdown reaching zero, and is write-once afterwards.
pub struct QuizSession {
    quiz: Quiz,
    questions: Vec<QuizQuestion>,
    current: usize,

    /// Question id -> selected option (1-based).
    answers: HashMap<i64, u8>,

    time_remaining: u32,
    outcome: Option<QuizOutcome>,
    result_recorded: bool,
}

impl QuizSession {
    /// Starts a session over a non-empty question set, with the countdown
    /// initialized to one minute per question. An empty set is a terminal
    /// display state ("no questions") and never becomes a session.
    pub fn new(quiz: Quiz, questions: Vec<QuizQuestion>) -> Result<Self, AppError> {
        if questions.is_empty() {
            return Err(AppError::ValidationFailed(
                "a quiz session needs at least one question".to_string(),
            ));
        }

        let time_remaining = questions.len() as u32 * SECONDS_PER_QUESTION;
        Ok(Self {
            quiz,
            questions,
            current: 0,
            answers: HashMap::new(),
            time_remaining,
            outcome: None,
            result_recorded: false,
        })
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &QuizQuestion {
        &self.questions[self.current]
    }

    /// The selected option for a question, if any (1-based).
    pub fn selected(&self, question_id: i64) -> Option<u8> {
        self.answers.get(&question_id).copied()
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    /// Countdown rendered as m:ss.
    pub fn time_display(&self) -> String {
        format!("{}:{:02}", self.time_remaining / 60, self.time_remaining % 60)
    }

    pub fn is_submitted(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<&QuizOutcome> {
        self.outcome.as_ref()
    }

    /// Sets or overwrites the answer for a loaded question.
    /// Valid only before submission; the option index is 1-based.
    pub fn select_option(&mut self, question_id: i64, option: u8) -> Result<(), AppError> {
        if self.is_submitted() {
            return Err(AppError::ValidationFailed(
                "the quiz has already been submitted".to_string(),
            ));
        }
        if !(1..=4).contains(&option) {
            return Err(AppError::ValidationFailed(format!(
                "option {} is out of range 1-4",
                option
            )));
        }
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(AppError::ValidationFailed(format!(
                "question #{} is not part of this quiz",
                question_id
            )));
        }

        self.answers.insert(question_id, option);
        Ok(())
    }

    /// Moves between questions, clamped to the question range. Moving past
    /// either boundary, or navigating after submission, is a no-op.
    pub fn navigate(&mut self, direction: Direction) {
        if self.is_submitted() {
            return;
        }
        self.current = match direction {
            Direction::Previous => self.current.saturating_sub(1),
            Direction::Next => (self.current + 1).min(self.questions.len() - 1),
        };
    }

    /// One second of countdown. Returns `true` when the deadline fired,
    /// which submits the session synchronously; further ticks are no-ops.
    pub fn tick(&mut self) -> bool {
        if self.is_submitted() {
            return false;
        }

        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            self.submit();
            return true;
        }
        false
    }

    /// Computes and freezes the score: one point per question whose
    /// recorded answer equals its correct option. Unanswered questions
    /// never contribute. Idempotent; a second call changes nothing.
    pub fn submit(&mut self) -> QuizOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        let score = self
            .questions
            .iter()
            .filter(|q| self.answers.get(&q.id) == Some(&q.correct))
            .count() as u32;

        let outcome = QuizOutcome {
            score,
            total: self.questions.len() as u32,
        };
        self.outcome = Some(outcome);
        tracing::info!(
            "Quiz '{}' submitted: {}/{}",
            self.quiz.title,
            outcome.score,
            outcome.total
        );
        outcome
    }

    /// Claims the one permitted result write. Returns `None` when the
    /// session is not submitted yet or the write already happened.
    pub(crate) fn begin_recording(&mut self) -> Option<QuizOutcome> {
        if self.result_recorded {
            return None;
        }
        let outcome = self.outcome?;
        self.result_recorded = true;
        Some(outcome)
    }

    /// Releases the claim after a failed write so the caller may retry
    /// manually. The frozen outcome is untouched.
    pub(crate) fn recording_failed(&mut self) {
        self.result_recorded = false;
    }
}

/// Drives the session's countdown, one [`QuizSession::tick`] per second,
/// until the deadline fires or the session is submitted some other way.
///
/// The timer is scoped to the returned future: dropping it on view teardown
/// releases the schedule, so no tick ever acts on a destroyed session. An
/// explicit submit between ticks ends the loop on the next pass.
pub async fn run_countdown(session: &mut QuizSession) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick of a fresh interval completes immediately.
    ticker.tick().await;

    while !session.is_submitted() {
        ticker.tick().await;
        if session.tick() {
            break;
        }
    }
}
