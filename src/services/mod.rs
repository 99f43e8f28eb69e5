// src/services/mod.rs

pub mod announcements;
pub mod attendance;
pub mod incidents;
pub mod profiles;
pub mod quizzes;
pub mod schedules;
pub mod tasks;
pub mod training;
