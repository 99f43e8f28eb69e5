// src/models/incident.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents the 'incidents' collection: a report a guard files for the
/// admin, optionally with a photo stored in the 'incident-photos' bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub guard_name: String,
    pub description: String,

    /// Public URL of the uploaded photo, if one was attached.
    pub photo_url: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for filing an incident report.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateIncidentRequest {
    #[validate(length(min = 1, max = 100, message = "Guard name is required"))]
    pub guard_name: String,

    #[validate(length(
        min = 1,
        max = 5000,
        message = "Description length must be between 1 and 5000 chars"
    ))]
    pub description: String,
}
