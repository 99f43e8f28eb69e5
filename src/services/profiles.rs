// src/services/profiles.rs

use serde_json::json;

use crate::{
    error::AppError,
    models::profile::Profile,
    store::{Collection, Filter, Query, RecordStore, decode_rows},
};

/// All registered guards. Admin screens use this for assignment pickers.
pub async fn list_guards(store: &dyn RecordStore) -> Result<Vec<Profile>, AppError> {
    let rows = store
        .fetch(
            Collection::Profiles,
            Query::new().filter(Filter::Eq("role", json!("guard"))),
        )
        .await?;
    decode_rows(Collection::Profiles, rows)
}

/// Case-insensitive name filter over an already-loaded guard list, the way
/// the assignment search box narrows it while typing.
pub fn filter_by_name<'a>(guards: &'a [Profile], search: &str) -> Vec<&'a Profile> {
    let needle = search.to_lowercase();
    guards
        .iter()
        .filter(|g| g.full_name.to_lowercase().contains(&needle))
        .collect()
}
