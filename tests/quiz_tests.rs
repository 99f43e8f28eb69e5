// tests/quiz_tests.rs

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use surakshasetu::error::AppError;
use surakshasetu::models::quiz::{QuestionDraft, Quiz, QuizQuestion, QuizResult};
use surakshasetu::quiz::{self, Direction, QuizSession};
use surakshasetu::services::quizzes::{self, LatestQuiz, QuizBuilder};
use surakshasetu::store::memory::MemoryStore;
use surakshasetu::store::{
    Collection, Query, RecordStore, SessionUser, StoredObject, Subscription, decode_rows,
};

fn question(id: i64, correct: u8) -> QuizQuestion {
    QuizQuestion {
        id,
        quiz_id: 1,
        question_text: format!("Question {}", id),
        options: vec![
            "A".to_string(),
            "B".to_string(),
            "C".to_string(),
            "D".to_string(),
        ],
        correct,
    }
}

fn quiz() -> Quiz {
    Quiz {
        id: 1,
        title: "Patrol Basics".to_string(),
        created_by: None,
        created_at: None,
    }
}

fn session(questions: Vec<QuizQuestion>) -> QuizSession {
    QuizSession::new(quiz(), questions).expect("session should start")
}

#[test]
fn countdown_starts_at_one_minute_per_question() {
    let session = session(vec![question(1, 1), question(2, 2), question(3, 3)]);
    assert_eq!(session.time_remaining(), 180);
    assert_eq!(session.time_display(), "3:00");
}

#[test]
fn scoring_counts_only_correct_answers() {
    // Arrange: 4 questions; answer two correctly, one incorrectly,
    // leave one unanswered
    let mut s = session(vec![
        question(1, 2),
        question(2, 3),
        question(3, 1),
        question(4, 4),
    ]);
    s.select_option(1, 2).unwrap(); // correct
    s.select_option(2, 3).unwrap(); // correct
    s.select_option(3, 4).unwrap(); // wrong

    // Act
    let outcome = s.submit();

    // Assert: wrong and unanswered both contribute nothing
    assert_eq!(outcome.score, 2);
    assert_eq!(outcome.total, 4);
}

#[test]
fn submit_is_idempotent() {
    // Arrange
    let mut s = session(vec![question(1, 1)]);
    s.select_option(1, 1).unwrap();

    // Act
    let first = s.submit();
    s.select_option(1, 2).unwrap_err(); // session is write-once now
    let second = s.submit();

    // Assert
    assert_eq!(first, second);
    assert_eq!(first.score, 1);
}

#[test]
fn deadline_submits_with_zero_score() {
    // Arrange: one question, 60 seconds, nothing answered
    let mut s = session(vec![question(1, 1)]);

    // Act: let the full minute elapse
    let mut fired = false;
    for _ in 0..60 {
        fired = s.tick();
    }

    // Assert: the last tick fired the deadline and submitted
    assert!(fired);
    assert!(s.is_submitted());
    let outcome = s.outcome().expect("outcome frozen");
    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.total, 1);

    // Ticks after the terminal transition are no-ops
    assert!(!s.tick());
}

#[test]
fn navigation_clamps_at_both_ends() {
    let mut s = session(vec![question(1, 1), question(2, 2)]);

    // Previous at the first question stays put
    s.navigate(Direction::Previous);
    assert_eq!(s.current_index(), 0);

    s.navigate(Direction::Next);
    assert_eq!(s.current_index(), 1);

    // Next at the last question stays put
    s.navigate(Direction::Next);
    assert_eq!(s.current_index(), 1);
}

#[test]
fn select_option_rejects_bad_input() {
    let mut s = session(vec![question(1, 1)]);

    assert!(matches!(
        s.select_option(1, 0),
        Err(AppError::ValidationFailed(_))
    ));
    assert!(matches!(
        s.select_option(1, 5),
        Err(AppError::ValidationFailed(_))
    ));
    assert!(matches!(
        s.select_option(42, 1),
        Err(AppError::ValidationFailed(_))
    ));

    // Overwriting a previous answer is allowed
    s.select_option(1, 3).unwrap();
    s.select_option(1, 1).unwrap();
    assert_eq!(s.selected(1), Some(1));
}

#[test]
fn empty_question_set_never_becomes_a_session() {
    assert!(matches!(
        QuizSession::new(quiz(), Vec::new()),
        Err(AppError::ValidationFailed(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn countdown_driver_runs_to_the_deadline() {
    // Arrange
    let mut s = session(vec![question(1, 1)]);

    // Act: paused time auto-advances, so the full minute elapses instantly
    quiz::run_countdown(&mut s).await;

    // Assert
    assert!(s.is_submitted());
    assert_eq!(s.outcome().unwrap().score, 0);
}

#[tokio::test]
async fn publish_then_take_quiz_end_to_end() {
    // Arrange: an admin publishes a two-question quiz
    let store = MemoryStore::new();
    store.sign_in(SessionUser {
        id: "admin-1".to_string(),
        email: "admin@surakshasetu.example".to_string(),
    });

    let mut builder = QuizBuilder::new("Site Security");
    builder
        .add_question(QuestionDraft {
            question_text: "Q1".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct: 2,
        })
        .unwrap();
    builder
        .add_question(QuestionDraft {
            question_text: "Q2".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct: 3,
        })
        .unwrap();
    builder.publish(&store).await.expect("Publish failed");

    // Act: a guard takes it, right on Q1, wrong on Q2
    let mut session = match quizzes::start_latest_quiz(&store).await.unwrap() {
        LatestQuiz::Ready(session) => session,
        _ => panic!("expected a ready session"),
    };
    assert_eq!(session.questions().len(), 2);
    assert_eq!(session.time_remaining(), 120);

    let q1 = session.questions()[0].id;
    let q2 = session.questions()[1].id;
    session.select_option(q1, 2).unwrap();
    session.select_option(q2, 1).unwrap();
    let outcome = session.submit();

    // Assert
    assert_eq!(outcome.score, 1);
    assert_eq!(outcome.total, 2);

    // The result is written exactly once
    let recorded = quizzes::record_result(&store, &mut session)
        .await
        .expect("Result write failed")
        .expect("First write should happen");
    assert_eq!(recorded.score, 1);
    assert_eq!(recorded.total, 2);
    assert_eq!(recorded.user_id.as_deref(), Some("admin-1"));

    let second = quizzes::record_result(&store, &mut session).await.unwrap();
    assert!(second.is_none());

    let rows = store
        .fetch(Collection::QuizResults, Query::new())
        .await
        .unwrap();
    let results: Vec<QuizResult> = decode_rows(Collection::QuizResults, rows).unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn question_options_survive_the_string_encoding() {
    // Arrange: questions are stored with options JSON-encoded in a string
    let store = MemoryStore::new();
    store
        .insert(Collection::Quizzes, json!({ "title": "Legacy" }))
        .await
        .unwrap();
    let quiz_rows = store.fetch(Collection::Quizzes, Query::new()).await.unwrap();
    let quiz_id = quiz_rows[0]["id"].as_i64().unwrap();
    store
        .insert(
            Collection::QuizQuestions,
            json!({
                "quiz_id": quiz_id,
                "question_text": "Encoded options",
                "options": "[\"w\",\"x\",\"y\",\"z\"]",
                "correct": 4,
            }),
        )
        .await
        .unwrap();

    // Act
    let session = match quizzes::start_latest_quiz(&store).await.unwrap() {
        LatestQuiz::Ready(session) => session,
        _ => panic!("expected a ready session"),
    };

    // Assert
    assert_eq!(session.questions()[0].options, vec!["w", "x", "y", "z"]);
}

#[tokio::test]
async fn missing_session_user_does_not_block_the_result() {
    // Arrange: nobody signed in
    let store = MemoryStore::new();
    let mut builder = QuizBuilder::new("Anonymous run");
    builder
        .add_question(QuestionDraft {
            question_text: "Q".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct: 1,
        })
        .unwrap();
    builder.publish(&store).await.unwrap();

    let mut session = match quizzes::start_latest_quiz(&store).await.unwrap() {
        LatestQuiz::Ready(session) => session,
        _ => panic!("expected a ready session"),
    };
    session.submit();

    // Act
    let recorded = quizzes::record_result(&store, &mut session)
        .await
        .unwrap()
        .unwrap();

    // Assert: a null user id is written instead
    assert!(recorded.user_id.is_none());
}

/// Store whose inserts can be switched to fail, for exercising the
/// rejected-write path.
struct FlakyStore {
    inner: MemoryStore,
    reject_inserts: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            reject_inserts: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn fetch(&self, collection: Collection, query: Query) -> Result<Vec<Value>, AppError> {
        self.inner.fetch(collection, query).await
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, AppError> {
        if self.reject_inserts.load(Ordering::SeqCst) {
            return Err(AppError::WriteRejected("insert refused".to_string()));
        }
        self.inner.insert(collection, record).await
    }

    async fn insert_many(
        &self,
        collection: Collection,
        records: Vec<Value>,
    ) -> Result<(), AppError> {
        self.inner.insert_many(collection, records).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: i64,
        patch: Value,
    ) -> Result<Value, AppError> {
        self.inner.update(collection, id, patch).await
    }

    async fn remove(&self, collection: Collection, id: i64) -> Result<(), AppError> {
        self.inner.remove(collection, id).await
    }

    async fn subscribe(&self, collection: Collection) -> Result<Subscription, AppError> {
        self.inner.subscribe(collection).await
    }

    async fn current_user(&self) -> Option<SessionUser> {
        self.inner.current_user().await
    }

    async fn upload_file(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, AppError> {
        self.inner.upload_file(bucket, name, bytes).await
    }
}

#[tokio::test]
async fn rejected_result_write_keeps_the_outcome_and_allows_retry() {
    // Arrange: a published quiz, taken and submitted
    let store = FlakyStore::new();
    let mut builder = QuizBuilder::new("Retry run");
    builder
        .add_question(QuestionDraft {
            question_text: "Q".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct: 1,
        })
        .unwrap();
    builder.publish(&store).await.unwrap();

    let mut session = match quizzes::start_latest_quiz(&store).await.unwrap() {
        LatestQuiz::Ready(session) => session,
        _ => panic!("expected a ready session"),
    };
    let question_id = session.questions()[0].id;
    session.select_option(question_id, 1).unwrap();
    let outcome = session.submit();

    // Act: the first write is refused
    store.reject_inserts.store(true, Ordering::SeqCst);
    let err = quizzes::record_result(&store, &mut session)
        .await
        .unwrap_err();

    // Assert: the error surfaces and the frozen outcome is untouched
    assert!(matches!(err, AppError::WriteRejected(_)));
    assert!(session.is_submitted());
    assert_eq!(session.outcome(), Some(&outcome));

    // Act: a manual retry after the store recovers
    store.reject_inserts.store(false, Ordering::SeqCst);
    let recorded = quizzes::record_result(&store, &mut session)
        .await
        .unwrap()
        .expect("retry should perform the write");

    // Assert: exactly one row, and no further write is permitted
    assert_eq!(recorded.score, outcome.score);
    assert_eq!(recorded.total, outcome.total);

    let rows = store
        .fetch(Collection::QuizResults, Query::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(
        quizzes::record_result(&store, &mut session)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn no_quizzes_and_no_questions_are_empty_states() {
    // No quiz at all
    let store = MemoryStore::new();
    assert!(matches!(
        quizzes::start_latest_quiz(&store).await.unwrap(),
        LatestQuiz::None
    ));

    // A quiz with zero questions
    store
        .insert(Collection::Quizzes, json!({ "title": "Hollow" }))
        .await
        .unwrap();
    assert!(matches!(
        quizzes::start_latest_quiz(&store).await.unwrap(),
        LatestQuiz::NoQuestions(_)
    ));
}

#[tokio::test]
async fn latest_quiz_wins() {
    // Arrange: two quizzes, the second created later
    let store = MemoryStore::new();
    store
        .insert(
            Collection::Quizzes,
            json!({ "title": "Old", "created_at": "2026-08-01T00:00:00Z" }),
        )
        .await
        .unwrap();
    let new_quiz = store
        .insert(
            Collection::Quizzes,
            json!({ "title": "New", "created_at": "2026-08-20T00:00:00Z" }),
        )
        .await
        .unwrap();
    store
        .insert(
            Collection::QuizQuestions,
            json!({
                "quiz_id": new_quiz["id"],
                "question_text": "Only question",
                "options": ["a", "b", "c", "d"],
                "correct": 1,
            }),
        )
        .await
        .unwrap();

    // Act
    let loaded = quizzes::start_latest_quiz(&store).await.unwrap();

    // Assert
    match loaded {
        LatestQuiz::Ready(session) => assert_eq!(session.quiz().title, "New"),
        _ => panic!("expected the newer quiz to load"),
    }
}
