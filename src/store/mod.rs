// src/store/mod.rs

pub mod memory;
pub mod rest;

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::AppError;

/// Named collections exposed by the hosted data service.
/// `name()` values are the remote table names and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Announcements,
    Tasks,
    DutySchedule,
    Incidents,
    Attendance,
    Quizzes,
    QuizQuestions,
    QuizResults,
    TrainingVideos,
    Profiles,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Announcements => "announcements",
            Collection::Tasks => "tasks",
            Collection::DutySchedule => "duty_schedule",
            Collection::Incidents => "incidents",
            Collection::Attendance => "attendance",
            Collection::Quizzes => "quizzes",
            Collection::QuizQuestions => "quiz_questions",
            Collection::QuizResults => "quiz_results",
            Collection::TrainingVideos => "training_videos",
            Collection::Profiles => "profiles",
        }
    }

    /// Column the service fills with the row creation time, where one
    /// exists. The in-memory binding injects it on insert the way the
    /// hosted service does with a column default.
    pub(crate) fn timestamp_field(self) -> Option<&'static str> {
        match self {
            Collection::Announcements
            | Collection::Tasks
            | Collection::Incidents
            | Collection::Quizzes
            | Collection::QuizResults => Some("created_at"),
            Collection::TrainingVideos => Some("uploaded_at"),
            Collection::DutySchedule
            | Collection::Attendance
            | Collection::QuizQuestions
            | Collection::Profiles => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Row filter understood by every binding.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Exact match on a column.
    Eq(&'static str, Value),

    /// Case-insensitive substring match on a text column.
    ILike(&'static str, String),
}

impl Filter {
    /// Evaluates the filter against a raw record. Used by the in-memory
    /// binding; the REST binding translates to query parameters instead.
    pub(crate) fn matches(&self, record: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => record.get(field) == Some(expected),
            Filter::ILike(field, needle) => record
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
        }
    }
}

/// Sort order for a fetch.
#[derive(Debug, Clone, Copy)]
pub struct Order {
    pub field: &'static str,
    pub ascending: bool,
}

impl Order {
    pub fn asc(field: &'static str) -> Self {
        Self { field, ascending: true }
    }

    pub fn desc(field: &'static str) -> Self {
        Self { field, ascending: false }
    }
}

/// Fetch parameters: optional filter, optional order, optional row limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Option<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Discrete change notification delivered by a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single change to a collection. For deletes the record may carry only
/// the row id.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: Value,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, record: Value) -> Self {
        Self { kind, record }
    }
}

/// Handle to an open change feed.
///
/// Ending the subscription is idempotent, and dropping the handle ends it,
/// so the feed is released on every exit path of the owning view.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    stop: Option<oneshot::Sender<()>>,
}

impl Subscription {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<ChangeEvent>,
        stop: oneshot::Sender<()>,
    ) -> Self {
        Self {
            events,
            stop: Some(stop),
        }
    }

    /// Waits for the next change. Returns `None` once the feed has ended,
    /// either locally via [`end`](Self::end) or because the upstream task
    /// stopped delivering.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Non-blocking variant of [`next_event`](Self::next_event).
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        self.events.try_recv().ok()
    }

    /// Releases the feed. Safe to call more than once.
    pub fn end(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
            self.events.close();
        }
    }

    /// Whether the upstream side is still delivering events.
    pub fn is_live(&self) -> bool {
        self.stop.is_some() && !self.events.is_closed()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.end();
    }
}

/// The signed-in user as reported by the hosted auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

/// Result of a storage upload.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub name: String,
    pub public_url: String,
}

/// Client of the hosted backend-as-a-service: generic CRUD + query over
/// named collections, a change feed, session lookup and object storage.
///
/// Records cross this boundary as raw `serde_json::Value` rows; the service
/// layer (de)serializes the typed models.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// One full read of a collection. Fails with `SourceUnavailable` when
    /// the service cannot be reached; callers surface this and leave the
    /// view empty rather than retrying automatically.
    async fn fetch(&self, collection: Collection, query: Query) -> Result<Vec<Value>, AppError>;

    /// Inserts one record and returns it as stored (id and defaults
    /// filled in).
    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, AppError>;

    /// Bulk insert. Used for quiz questions and attendance sheets.
    async fn insert_many(&self, collection: Collection, records: Vec<Value>)
    -> Result<(), AppError>;

    /// Merges `patch` into the record with the given id.
    /// Fails with `NotFound` when no such record exists.
    async fn update(&self, collection: Collection, id: i64, patch: Value)
    -> Result<Value, AppError>;

    /// Fails with `NotFound` when no such record exists.
    async fn remove(&self, collection: Collection, id: i64) -> Result<(), AppError>;

    /// Opens a change feed over the collection.
    async fn subscribe(&self, collection: Collection) -> Result<Subscription, AppError>;

    /// The signed-in user, if a session exists. Absence is not an error.
    async fn current_user(&self) -> Option<SessionUser>;

    /// Uploads a file to a storage bucket and returns its public URL.
    /// Rejects overwrites of an existing object.
    async fn upload_file(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, AppError>;
}

/// Decodes one raw row into a typed model.
pub fn decode_row<T: DeserializeOwned>(collection: Collection, row: Value) -> Result<T, AppError> {
    serde_json::from_value(row).map_err(|e| {
        tracing::error!("Malformed {} record: {:?}", collection, e);
        AppError::SourceUnavailable(format!("malformed {} record: {}", collection, e))
    })
}

/// Decodes raw rows into a typed model. A malformed row means the remote
/// schema and this client disagree, so the whole read is rejected.
pub fn decode_rows<T: DeserializeOwned>(
    collection: Collection,
    rows: Vec<Value>,
) -> Result<Vec<T>, AppError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| {
                tracing::error!("Malformed {} record: {:?}", collection, e);
                AppError::SourceUnavailable(format!("malformed {} record: {}", collection, e))
            })
        })
        .collect()
}
