// src/services/training.rs

use serde_json::json;
use url::Url;
use validator::Validate;

use crate::{
    error::AppError,
    models::training::{CreateTrainingVideoRequest, TrainingVideo},
    store::{Collection, Order, Query, RecordStore, decode_row, decode_rows},
    utils::objects::unique_object_name,
};

pub const TRAINING_VIDEO_BUCKET: &str = "training-videos";

/// Upload a training video: object storage first, then the record carrying
/// the public URL. A failed upload aborts before anything is written.
pub async fn upload_training_video(
    store: &dyn RecordStore,
    payload: CreateTrainingVideoRequest,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<TrainingVideo, AppError> {
    payload.validate()?;

    let object_name = unique_object_name(file_name)?;
    let stored = store
        .upload_file(TRAINING_VIDEO_BUCKET, &object_name, bytes)
        .await
        .map_err(|e| {
            tracing::error!("Upload failed: {}", e);
            e
        })?;
    Url::parse(&stored.public_url).map_err(|e| {
        AppError::WriteRejected(format!("storage returned an invalid public URL: {}", e))
    })?;

    let user = store.current_user().await;
    let row = store
        .insert(
            Collection::TrainingVideos,
            json!({
                "title": payload.title.trim(),
                "description": payload.description,
                "video_url": stored.public_url,
                "uploaded_by": user.map(|u| u.email).unwrap_or_else(|| "Admin".to_string()),
            }),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to record training video: {}", e);
            e
        })?;

    decode_row(Collection::TrainingVideos, row)
}

/// Training videos for the guard library, newest upload first.
pub async fn list_training_videos(store: &dyn RecordStore) -> Result<Vec<TrainingVideo>, AppError> {
    let rows = store
        .fetch(
            Collection::TrainingVideos,
            Query::new().order(Order::desc("uploaded_at")),
        )
        .await?;
    decode_rows(Collection::TrainingVideos, rows)
}
