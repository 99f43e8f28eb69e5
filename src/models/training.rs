// src/models/training.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents the 'training_videos' collection.
/// Listed descending by `uploaded_at` on the guard side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingVideo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Public URL of the object in the 'training-videos' bucket.
    pub video_url: String,

    pub uploaded_by: String,
    pub uploaded_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for uploading a training video. The URL is produced by the storage
/// upload, never supplied by the caller.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTrainingVideoRequest {
    #[validate(length(min = 1, max = 150, message = "Title is required"))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,
}
