// src/models/mod.rs

pub mod announcement;
pub mod attendance;
pub mod incident;
pub mod profile;
pub mod quiz;
pub mod schedule;
pub mod task;
pub mod training;
