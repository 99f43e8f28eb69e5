// src/models/schedule.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents the 'duty_schedule' collection.
/// Listed ascending by `date` for both roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DutySchedule {
    pub id: i64,

    /// Profile identifier of the assigned guard (auth UUID).
    pub guard_id: String,

    /// Denormalized copy of the guard's name, resolved at assignment time.
    pub guard_name: String,

    pub date: chrono::NaiveDate,
    pub shift_time: String,
    pub location: String,
}

/// DTO for adding a duty. The guard's name is looked up from the profile,
/// never supplied by the caller.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    #[validate(length(min = 1, message = "Please select a guard."))]
    pub guard_id: String,

    pub date: chrono::NaiveDate,

    #[validate(length(min = 1, max = 100, message = "Shift time required."))]
    pub shift_time: String,

    #[validate(length(min = 1, max = 150, message = "Location required."))]
    pub location: String,
}
