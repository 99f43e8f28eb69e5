// src/utils/objects.rs

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;

/// Builds a unique storage object name from an uploaded file's original
/// name, keeping only its extension: `<millis>_<uuid>.<ext>`.
///
/// Mirrors how the portal has always named incident photos and training
/// videos, so objects stay unique without an upsert.
pub fn unique_object_name(original_name: &str) -> Result<String, AppError> {
    let ext = original_name
        .rsplit('.')
        .next()
        .filter(|ext| !ext.is_empty() && *ext != original_name)
        .ok_or_else(|| {
            AppError::ValidationFailed(format!(
                "file name '{}' has no extension",
                original_name
            ))
        })?;

    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::ValidationFailed(format!(
            "file extension '{}' is not allowed",
            ext
        )));
    }

    Ok(format!(
        "{}_{}.{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        ext.to_ascii_lowercase()
    ))
}
