// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted data service. When absent the portal runs
    /// against the in-memory store.
    pub service_url: Option<String>,

    /// API key sent with every request to the hosted service.
    pub service_key: Option<String>,

    /// Access token of the signed-in user, if a session exists.
    pub access_token: Option<String>,

    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let service_url = env::var("SERVICE_URL").ok();
        let service_key = env::var("SERVICE_KEY").ok();
        let access_token = env::var("SERVICE_ACCESS_TOKEN").ok();

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            service_url,
            service_key,
            access_token,
            rust_log,
        }
    }
}
