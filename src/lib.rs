// src/lib.rs

pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod quiz;
pub mod services;
pub mod store;
pub mod utils;

// Re-export specific items for convenience if needed
pub use error::AppError;
pub use store::RecordStore;
