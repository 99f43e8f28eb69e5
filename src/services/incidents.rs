// src/services/incidents.rs

use serde_json::json;
use url::Url;
use validator::Validate;

use crate::{
    error::AppError,
    models::incident::{CreateIncidentRequest, Incident},
    store::{Collection, Order, Query, RecordStore, decode_row, decode_rows},
    utils::{html::clean_text, objects::unique_object_name},
};

pub const INCIDENT_PHOTO_BUCKET: &str = "incident-photos";

/// File an incident report, optionally with a photo.
///
/// The photo goes to object storage first; only its public URL is written
/// to the record. A failed upload aborts the report, a report without a
/// photo is fine.
pub async fn report_incident(
    store: &dyn RecordStore,
    payload: CreateIncidentRequest,
    photo: Option<(&str, Vec<u8>)>,
) -> Result<Incident, AppError> {
    payload.validate()?;

    let photo_url = match photo {
        Some((file_name, bytes)) => {
            let object_name = unique_object_name(file_name)?;
            let stored = store
                .upload_file(INCIDENT_PHOTO_BUCKET, &object_name, bytes)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to upload incident photo: {}", e);
                    e
                })?;
            Url::parse(&stored.public_url).map_err(|e| {
                AppError::WriteRejected(format!("storage returned an invalid public URL: {}", e))
            })?;
            Some(stored.public_url)
        }
        None => None,
    };

    let row = store
        .insert(
            Collection::Incidents,
            json!({
                "guard_name": payload.guard_name.trim(),
                "description": clean_text(payload.description.trim()),
                "photo_url": photo_url,
            }),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to submit incident report: {}", e);
            e
        })?;

    decode_row(Collection::Incidents, row)
}

/// All incident reports for the admin review screen, newest first.
pub async fn list_incidents(store: &dyn RecordStore) -> Result<Vec<Incident>, AppError> {
    let rows = store
        .fetch(
            Collection::Incidents,
            Query::new().order(Order::desc("created_at")),
        )
        .await?;
    decode_rows(Collection::Incidents, rows)
}
