// src/models/task.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents the 'tasks' collection: a duty item an admin assigns to a
/// named guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub guard_name: String,
    pub task_title: String,
    pub description: String,
    pub deadline: chrono::NaiveDate,
    pub location: String,

    /// 'Low', 'Medium' or 'High'.
    pub priority: String,

    pub notes: Option<String>,

    /// Always created as 'Pending'; no workflow beyond that in the portal.
    pub status: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for assigning a new task. All fields except notes are required.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 100, message = "Guard name is required"))]
    pub guard_name: String,

    #[validate(length(min = 1, max = 150, message = "Task title is required"))]
    pub task_title: String,

    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,

    pub deadline: chrono::NaiveDate,

    #[validate(length(min = 1, max = 150, message = "Location is required"))]
    pub location: String,

    #[serde(default = "default_priority")]
    pub priority: String,

    pub notes: Option<String>,
}

fn default_priority() -> String {
    "Medium".to_string()
}
