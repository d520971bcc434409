use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; invalid values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Final fallback locale appended to every negotiated chain.
    pub default_locale: String,
    /// Locale requested when a resume has no `meta.language`.
    pub fallback_language: String,
    /// Whether the HTTP API may read local image paths from disk.
    pub local_images: bool,
    /// Whether the HTTP API may download remote images for self-contained resumes.
    pub remote_images: bool,
    /// Directory local image paths are resolved against.
    pub image_root: PathBuf,
    pub fetch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let image_root = match std::env::var("VITAE_IMAGE_ROOT") {
            Ok(root) => PathBuf::from(root),
            Err(_) => std::env::current_dir().context("Cannot determine working directory")?,
        };

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            default_locale: env_or("VITAE_DEFAULT_LOCALE", "en"),
            fallback_language: env_or("VITAE_FALLBACK_LANGUAGE", "en-US"),
            local_images: parse_bool(
                "VITAE_LOCAL_IMAGES",
                &env_or("VITAE_LOCAL_IMAGES", "false"),
            )?,
            remote_images: parse_bool(
                "VITAE_REMOTE_IMAGES",
                &env_or("VITAE_REMOTE_IMAGES", "false"),
            )?,
            image_root,
            fetch_timeout: Duration::from_secs(parse_env("VITAE_FETCH_TIMEOUT_SECS", 30)?),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{key} must be a boolean, got '{other}'"),
    }
}
