use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono_tz::Tz;

use crate::error::{AppError, AppResult};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-exp-1114";
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_DB_FILE: &str = "questforge.sqlite";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub http_timeout: StdDuration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            http_timeout: StdDuration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub db_file: String,
    pub timezone: Tz,
    pub seed_demo_user: bool,
    pub gemini: GeminiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            db_file: DEFAULT_DB_FILE.to_string(),
            timezone: Tz::UTC,
            seed_demo_user: true,
            gemini: GeminiConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(dir) = get("QUESTFORGE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = get("QUESTFORGE_DB_FILE") {
            config.db_file = file;
        }
        if let Some(name) = get("QUESTFORGE_TIMEZONE") {
            config.timezone = Tz::from_str(&name).map_err(|_| {
                AppError::validation(format!("QUESTFORGE_TIMEZONE is not a known time zone: {name}"))
            })?;
        }
        if let Some(flag) = get("QUESTFORGE_SEED_DEMO_USER") {
            config.seed_demo_user = parse_bool("QUESTFORGE_SEED_DEMO_USER", &flag)?;
        }

        config.gemini.api_key = get("QUESTFORGE_GEMINI_API_KEY").or_else(|| get("GEMINI_API_KEY"));
        if let Some(url) = get("QUESTFORGE_GEMINI_BASE_URL") {
            config.gemini.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("QUESTFORGE_GEMINI_MODEL") {
            config.gemini.model = model;
        }
        if let Some(secs) = get("QUESTFORGE_HTTP_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().ok().filter(|value| *value > 0).ok_or_else(|| {
                AppError::validation(format!(
                    "QUESTFORGE_HTTP_TIMEOUT_SECS must be a positive integer, got {secs}"
                ))
            })?;
            config.gemini.http_timeout = StdDuration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn parse_bool(key: &str, value: &str) -> AppResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::validation(format!(
            "{key} must be a boolean, got {value}"
        ))),
    }
}
