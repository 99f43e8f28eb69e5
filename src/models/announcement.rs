// src/models/announcement.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::feed::Keyed;

/// Represents the 'announcements' collection.
/// The defining order of the collection is `created_at` descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: i64,

    /// Optional headline; guards see "Important Update" when absent.
    pub title: Option<String>,

    pub message: String,

    /// Auth identifier of the posting admin, if a session existed.
    pub created_by: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Keyed for Announcement {
    fn key(&self) -> i64 {
        self.id
    }
}

/// DTO for posting a new announcement.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnnouncementRequest {
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Message length must be between 1 and 2000 chars"
    ))]
    pub message: String,

    #[validate(length(max = 150))]
    pub title: Option<String>,
}
