// src/services/schedules.rs

use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        profile::Profile,
        schedule::{CreateScheduleRequest, DutySchedule},
    },
    store::{Collection, Filter, Order, Query, RecordStore, decode_row, decode_rows},
};

/// Add a duty to the schedule.
/// The guard's display name is denormalized from their profile at
/// assignment time, matching how the roster has always been stored.
pub async fn add_schedule(
    store: &dyn RecordStore,
    payload: CreateScheduleRequest,
) -> Result<DutySchedule, AppError> {
    payload.validate()?;

    let rows = store
        .fetch(
            Collection::Profiles,
            Query::new().filter(Filter::Eq("id", json!(payload.guard_id))),
        )
        .await?;
    let profile: Profile = decode_rows(Collection::Profiles, rows)?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("guard profile {}", payload.guard_id)))?;

    let row = store
        .insert(
            Collection::DutySchedule,
            json!({
                "guard_id": payload.guard_id,
                "guard_name": profile.full_name,
                "date": payload.date,
                "shift_time": payload.shift_time,
                "location": payload.location,
            }),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to add duty: {}", e);
            e
        })?;

    decode_row(Collection::DutySchedule, row)
}

/// The full duty roster, earliest date first. Both roles see all duties.
pub async fn list_schedules(store: &dyn RecordStore) -> Result<Vec<DutySchedule>, AppError> {
    let rows = store
        .fetch(
            Collection::DutySchedule,
            Query::new().order(Order::asc("date")),
        )
        .await?;
    decode_rows(Collection::DutySchedule, rows)
}
