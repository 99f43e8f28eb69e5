// src/models/profile.rs

use serde::{Deserialize, Serialize};

/// Represents the 'profiles' collection maintained by the hosted auth
/// service. The id is the auth UUID, not a table serial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub full_name: String,

    /// 'guard' or 'admin'.
    pub role: String,
}
