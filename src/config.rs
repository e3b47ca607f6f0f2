use crate::request::SurfaceId;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL of the chat platform's REST API, without a trailing slash.
    pub chat_api_base: String,
    pub chat_bot_token: String,
    pub gateway_webhook_secret: String,
    /// Surface where notices are posted and reviewed.
    pub review_surface: SurfaceId,
    /// Surface receiving copies of finalized (Approved/Denied) notices.
    pub archive_surface: SurfaceId,
    /// SQLite database file. Defaults to `furlough.db` in the working directory.
    pub database_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = env::var("FURLOUGH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("FURLOUGH_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("FURLOUGH_PORT must be a valid port number")?;

        let chat_api_base = normalize_base_url(
            env::var("CHAT_API_BASE").unwrap_or_else(|_| "https://chat.example.com/api".to_string()),
        );

        let chat_bot_token =
            env::var("CHAT_BOT_TOKEN").context("CHAT_BOT_TOKEN environment variable is required")?;

        let gateway_webhook_secret = env::var("GATEWAY_WEBHOOK_SECRET")
            .context("GATEWAY_WEBHOOK_SECRET environment variable is required")?;

        let review_surface = SurfaceId(
            env::var("REVIEW_SURFACE_ID")
                .context("REVIEW_SURFACE_ID environment variable is required")?,
        );

        let archive_surface = SurfaceId(
            env::var("ARCHIVE_SURFACE_ID")
                .context("ARCHIVE_SURFACE_ID environment variable is required")?,
        );

        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("furlough.db"));

        Ok(Config {
            host,
            port,
            chat_api_base,
            chat_bot_token,
            gateway_webhook_secret,
            review_surface,
            archive_surface,
            database_path,
        })
    }
}

/// Strips trailing slashes from the API base so endpoint paths can be appended
/// with a single `/` join.
pub fn normalize_base_url(value: String) -> String {
    let trimmed = value.trim_end_matches('/');
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_plain() {
        assert_eq!(
            normalize_base_url("https://chat.example.com/api".to_string()),
            "https://chat.example.com/api"
        );
    }

    #[test]
    fn test_normalize_base_url_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://chat.example.com/api/".to_string()),
            "https://chat.example.com/api"
        );
        assert_eq!(
            normalize_base_url("https://chat.example.com/api///".to_string()),
            "https://chat.example.com/api"
        );
    }
}
