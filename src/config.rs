//! Runtime settings.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory. CLI flags override them in `app`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, ErrorKind};

pub const DEFAULT_BASE_URL: &str = "https://api.eia.gov/v2/steo/data/";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Text file holding the API key, one candidate key per line.
    pub api_key_file: PathBuf,
    /// 0-based line of `api_key_file` to use.
    pub api_key_line: usize,
    pub base_url: String,
    pub timeout: Duration,
    /// Fetch worker threads; 1 keeps requests strictly sequential.
    pub workers: usize,
    /// Minimum spacing between two upstream requests.
    pub min_request_interval: Duration,
    pub master_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key_file: PathBuf::from("api_key.txt"),
            api_key_line: 0,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            workers: 1,
            min_request_interval: Duration::from_millis(250),
            master_dir: PathBuf::from("master_output"),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = Settings::default();

        if let Some(v) = lookup("STEO_API_KEY_FILE") {
            settings.api_key_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("STEO_API_KEY_LINE") {
            settings.api_key_line = parse_var("STEO_API_KEY_LINE", &v)?;
        }
        if let Some(v) = lookup("STEO_BASE_URL") {
            settings.base_url = v;
        }
        if let Some(v) = lookup("STEO_TIMEOUT_SECS") {
            settings.timeout = Duration::from_secs(parse_var("STEO_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("STEO_WORKERS") {
            settings.workers = parse_var("STEO_WORKERS", &v)?;
        }
        if let Some(v) = lookup("STEO_MIN_REQUEST_INTERVAL_MS") {
            settings.min_request_interval =
                Duration::from_millis(parse_var("STEO_MIN_REQUEST_INTERVAL_MS", &v)?);
        }
        if let Some(v) = lookup("STEO_MASTER_DIR") {
            settings.master_dir = PathBuf::from(v);
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.workers == 0 {
            return Err(AppError::new(ErrorKind::Config, "Worker count must be at least 1."));
        }
        if self.timeout.is_zero() {
            return Err(AppError::new(ErrorKind::Config, "Request timeout must be positive."));
        }
        if self.base_url.trim().is_empty() {
            return Err(AppError::new(ErrorKind::Config, "Base URL must not be empty."));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| AppError::new(ErrorKind::Config, format!("Invalid {name}='{raw}': {e}")))
}
