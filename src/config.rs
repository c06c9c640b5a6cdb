//! Forum connection configuration

use crate::error::{Error, Result};
use std::env;

const DEFAULT_BASE_URL: &str = "https://forums.somethingawful.com";

/// Connection configuration for the forum and the image host.
#[derive(Debug, Clone)]
pub struct ForumConfig {
    pub base_url: String,
    /// The `bbuserid` login cookie value.
    pub user_id: String,
    /// The `bbpassword` login cookie value.
    pub password_hash: String,
    /// Imgur application id; uploads are unavailable without one.
    pub imgur_client_id: Option<String>,
}

impl ForumConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `AWFUL_USER_ID`
    /// - `AWFUL_PASSWORD_HASH`
    ///
    /// Optional:
    /// - `AWFUL_BASE_URL` (default: the live forum)
    /// - `IMGUR_CLIENT_ID`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a required variable is missing.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            base_url: env::var("AWFUL_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            user_id: env::var("AWFUL_USER_ID")
                .map_err(|_| Error::Config("AWFUL_USER_ID not set".into()))?,
            password_hash: env::var("AWFUL_PASSWORD_HASH")
                .map_err(|_| Error::Config("AWFUL_PASSWORD_HASH not set".into()))?,
            imgur_client_id: env::var("IMGUR_CLIENT_ID").ok(),
        })
    }
}
