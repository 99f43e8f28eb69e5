// src/services/announcements.rs

use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    feed::LiveFeed,
    models::announcement::{Announcement, CreateAnnouncementRequest},
    store::{Collection, Order, Query, RecordStore, decode_row, decode_rows},
    utils::html::clean_text,
};

/// Post a new announcement.
/// The posting admin's id is attached when a session exists; its absence
/// never blocks the post.
pub async fn post_announcement(
    store: &dyn RecordStore,
    payload: CreateAnnouncementRequest,
) -> Result<Announcement, AppError> {
    payload.validate()?;

    let message = clean_text(payload.message.trim());
    if message.is_empty() {
        return Err(AppError::ValidationFailed(
            "Please write something before posting!".to_string(),
        ));
    }

    let user = store.current_user().await;
    let row = store
        .insert(
            Collection::Announcements,
            json!({
                "title": payload.title,
                "message": message,
                "created_by": user.map(|u| u.id),
            }),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to post announcement: {}", e);
            e
        })?;

    decode_row(Collection::Announcements, row)
}

/// List announcements, most recent first.
pub async fn list_announcements(store: &dyn RecordStore) -> Result<Vec<Announcement>, AppError> {
    let rows = store
        .fetch(
            Collection::Announcements,
            Query::new().order(Order::desc("created_at")),
        )
        .await?;
    decode_rows(Collection::Announcements, rows)
}

/// Replace an announcement's message, keeping its position in the feed.
pub async fn edit_announcement(
    store: &dyn RecordStore,
    id: i64,
    message: &str,
) -> Result<Announcement, AppError> {
    let message = clean_text(message.trim());
    if message.is_empty() {
        return Err(AppError::ValidationFailed(
            "Message cannot be empty!".to_string(),
        ));
    }

    let row = store
        .update(Collection::Announcements, id, json!({ "message": message }))
        .await?;
    decode_row(Collection::Announcements, row)
}

/// Delete an announcement. A missing target surfaces as `NotFound` here,
/// because the user asked for it explicitly.
pub async fn delete_announcement(store: &dyn RecordStore, id: i64) -> Result<(), AppError> {
    store.remove(Collection::Announcements, id).await
}

/// Open the reconciled live view of the announcement feed:
/// one full read sorted by creation time descending, plus a subscription.
pub async fn open_feed(store: &dyn RecordStore) -> Result<LiveFeed<Announcement>, AppError> {
    LiveFeed::open(
        store,
        Collection::Announcements,
        Query::new().order(Order::desc("created_at")),
    )
    .await
}
