// src/models/attendance.rs

use serde::{Deserialize, Serialize};

/// Attendance status a guard can be marked with on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// Represents the 'attendance' collection: one row per guard per saved
/// sheet. Unmarked guards never produce a row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub guard_name: String,
    pub date: chrono::NaiveDate,
    pub status: AttendanceStatus,

    /// Who saved the sheet, e.g. "Admin".
    pub marked_by: String,
}
