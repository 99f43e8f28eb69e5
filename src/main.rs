// src/main.rs

use std::time::Duration;

use dotenvy::dotenv;
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use surakshasetu::config::Config;
use surakshasetu::error::AppError;
use surakshasetu::models::announcement::CreateAnnouncementRequest;
use surakshasetu::models::quiz::QuestionDraft;
use surakshasetu::services::{announcements, profiles, quizzes, schedules};
use surakshasetu::store::memory::MemoryStore;
use surakshasetu::store::rest::RestStore;
use surakshasetu::store::{Collection, RecordStore, SessionUser};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Pick the record store binding: the hosted service when configured,
    // otherwise a seeded in-memory store.
    let store: Box<dyn RecordStore> = match (&config.service_url, &config.service_key) {
        (Some(url), Some(key)) => {
            tracing::info!("Using hosted data service at {}", url);
            let mut rest = RestStore::new(url, key).expect("SERVICE_URL must be a valid URL");
            if let Some(token) = &config.access_token {
                rest = rest.with_session(token);
            }
            Box::new(rest)
        }
        _ => {
            tracing::info!("SERVICE_URL not set, using the in-memory store");
            let memory = MemoryStore::new();
            memory.sign_in(SessionUser {
                id: "6a1f0f3e-demo-admin".to_string(),
                email: "admin@surakshasetu.example".to_string(),
            });
            seed_demo_guards(&memory)
                .await
                .expect("Failed to seed demo guards");
            Box::new(memory)
        }
    };

    if let Err(e) = run_walkthrough(store.as_ref()).await {
        tracing::error!("Portal walkthrough failed: {}", e);
    }
}

/// Registers a couple of guard profiles, which signup would normally
/// create, so the assignment flows have someone to assign to.
async fn seed_demo_guards(store: &MemoryStore) -> Result<(), AppError> {
    for (id, full_name) in [
        ("0b2c71aa-guard-1", "Ravi Kumar"),
        ("4e9d02bc-guard-2", "Sunita Sharma"),
    ] {
        store
            .insert(
                Collection::Profiles,
                json!({ "id": id, "full_name": full_name, "role": "guard" }),
            )
            .await?;
    }
    Ok(())
}

/// Exercises one admin round trip through the portal: announcement with a
/// live feed, a guard lookup, and a published quiz taken end to end.
async fn run_walkthrough(store: &dyn RecordStore) -> Result<(), AppError> {
    // Announcements: open the reconciled feed, then post into it.
    let mut feed = announcements::open_feed(store).await?;
    announcements::post_announcement(
        store,
        CreateAnnouncementRequest {
            message: "Night patrol timings change from Monday.".to_string(),
            title: Some("Schedule update".to_string()),
        },
    )
    .await?;

    match tokio::time::timeout(Duration::from_secs(10), feed.next_change()).await {
        Ok(true) => tracing::info!("Announcement feed now holds {} items", feed.records().len()),
        Ok(false) => tracing::warn!("Announcement feed ended before the post arrived"),
        Err(_) => tracing::warn!("No feed event within 10s"),
    }
    feed.close();

    // Guards available for assignment.
    let guards = profiles::list_guards(store).await?;
    tracing::info!("{} guards registered", guards.len());
    let roster = schedules::list_schedules(store).await?;
    tracing::info!("{} duties scheduled", roster.len());

    // Publish a quiz and take it.
    let mut builder = quizzes::QuizBuilder::new("Security Basics");
    builder.add_question(QuestionDraft {
        question_text: "Who must be informed first when an incident occurs?".to_string(),
        options: vec![
            "The press".to_string(),
            "The site admin".to_string(),
            "Nobody".to_string(),
            "The visitor".to_string(),
        ],
        correct: 2,
    })?;
    builder.publish(store).await?;

    match quizzes::start_latest_quiz(store).await? {
        quizzes::LatestQuiz::None => tracing::info!("No quizzes available."),
        quizzes::LatestQuiz::NoQuestions(quiz) => {
            tracing::info!("Quiz '{}' has no questions yet", quiz.title);
        }
        quizzes::LatestQuiz::Ready(mut session) => {
            tracing::info!(
                "Taking quiz '{}', time left {}",
                session.quiz().title,
                session.time_display()
            );
            let question_id = session.current_question().id;
            session.select_option(question_id, 2)?;
            let outcome = session.submit();
            tracing::info!("Your Score: {} / {}", outcome.score, outcome.total);

            if let Some(result) = quizzes::record_result(store, &mut session).await? {
                tracing::info!("Quiz result #{} stored", result.id);
            }
        }
    }

    Ok(())
}
