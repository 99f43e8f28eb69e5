// src/services/tasks.rs

use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::task::{CreateTaskRequest, Task},
    store::{Collection, Order, Query, RecordStore, decode_row, decode_rows},
};

/// Repository over the shared 'tasks' collection.
///
/// The task board used to live in a browser-local cache written back as an
/// implicit side effect of every state change. Here it is an explicit,
/// constructor-injected repository: persistence is the add/list/remove
/// contract below, and both roles read the same collection.
pub struct TaskRepository<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> TaskRepository<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// Assign a task to a guard. New tasks always start as 'Pending'.
    pub async fn add(&self, payload: CreateTaskRequest) -> Result<Task, AppError> {
        payload.validate()?;

        let row = self
            .store
            .insert(
                Collection::Tasks,
                json!({
                    "guard_name": payload.guard_name,
                    "task_title": payload.task_title,
                    "description": payload.description,
                    "deadline": payload.deadline,
                    "location": payload.location,
                    "priority": payload.priority,
                    "notes": payload.notes,
                    "status": "Pending",
                }),
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to add task: {}", e);
                e
            })?;

        decode_row(Collection::Tasks, row)
    }

    /// All tasks in assignment order.
    pub async fn list(&self) -> Result<Vec<Task>, AppError> {
        let rows = self
            .store
            .fetch(Collection::Tasks, Query::new().order(Order::asc("created_at")))
            .await?;
        decode_rows(Collection::Tasks, rows)
    }

    /// Remove a task. A missing target surfaces as `NotFound`.
    pub async fn remove(&self, id: i64) -> Result<(), AppError> {
        self.store.remove(Collection::Tasks, id).await
    }
}
