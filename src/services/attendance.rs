// src/services/attendance.rs

use std::collections::HashMap;

use serde_json::json;

use crate::{
    error::AppError,
    models::attendance::{AttendanceRecord, AttendanceStatus},
    store::{Collection, Filter, Order, Query, RecordStore, decode_rows},
};

/// One day's attendance sheet being marked by the admin.
///
/// Marks are local until [`save`](Self::save); toggling a guard to the
/// status they already have clears the mark, and unmarked guards never
/// produce a row.
pub struct AttendanceSheet {
    date: chrono::NaiveDate,
    marks: HashMap<String, AttendanceStatus>,
}

impl AttendanceSheet {
    pub fn new(date: chrono::NaiveDate) -> Self {
        Self {
            date,
            marks: HashMap::new(),
        }
    }

    pub fn date(&self) -> chrono::NaiveDate {
        self.date
    }

    /// Mark a guard Present or Absent; marking the same status again
    /// clears it.
    pub fn toggle(&mut self, guard_name: &str, status: AttendanceStatus) {
        match self.marks.get(guard_name) {
            Some(current) if *current == status => {
                self.marks.remove(guard_name);
            }
            _ => {
                self.marks.insert(guard_name.to_string(), status);
            }
        }
    }

    pub fn status_of(&self, guard_name: &str) -> Option<AttendanceStatus> {
        self.marks.get(guard_name).copied()
    }

    pub fn marked_count(&self) -> usize {
        self.marks.len()
    }

    /// Persist every marked row in one batch and clear the sheet.
    /// An empty sheet is a local validation error; no write is issued.
    pub async fn save(
        &mut self,
        store: &dyn RecordStore,
        marked_by: &str,
    ) -> Result<usize, AppError> {
        if self.marks.is_empty() {
            return Err(AppError::ValidationFailed(
                "Please mark attendance before saving!".to_string(),
            ));
        }

        let records: Vec<_> = self
            .marks
            .iter()
            .map(|(guard_name, status)| {
                json!({
                    "guard_name": guard_name,
                    "date": self.date,
                    "status": status,
                    "marked_by": marked_by,
                })
            })
            .collect();
        let saved = records.len();

        store
            .insert_many(Collection::Attendance, records)
            .await
            .map_err(|e| {
                tracing::error!("Failed to save attendance: {}", e);
                e
            })?;

        self.marks.clear();
        Ok(saved)
    }
}

/// Attendance history for one guard, newest date first. The match is a
/// case-insensitive substring, because sheets store display names while
/// guards identify by the name part of their email.
pub async fn history_for(
    store: &dyn RecordStore,
    guard_name: &str,
) -> Result<Vec<AttendanceRecord>, AppError> {
    let rows = store
        .fetch(
            Collection::Attendance,
            Query::new()
                .filter(Filter::ILike("guard_name", guard_name.to_string()))
                .order(Order::desc("date")),
        )
        .await?;
    decode_rows(Collection::Attendance, rows)
}

/// Attendance history of the signed-in guard, keyed by their email's
/// name part.
pub async fn my_history(store: &dyn RecordStore) -> Result<Vec<AttendanceRecord>, AppError> {
    let user = store.current_user().await.ok_or_else(|| {
        AppError::ValidationFailed("Please log in first!".to_string())
    })?;

    let name = user.email.split('@').next().unwrap_or(&user.email);
    history_for(store, name).await
}
