use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    /// `None` disables the remote generator; generation is then local-only.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub remote_timeout_secs: u64,
    pub min_content_length: usize,
    pub max_questions_per_kind: usize,
    pub max_upload_bytes: usize,
    /// Idle lifetime of a session. Zero keeps sessions until deleted.
    pub session_ttl_secs: u64,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let gemini_api_key = get_env_opt("GEMINI_API_KEY").or_else(|| get_env_opt("GOOGLE_API_KEY"));

        let log_format = match get_env_or("LOG_FORMAT", "text").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(Error::Config(format!("Invalid value for LOG_FORMAT: {}", other)));
            }
        };

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8501"),
            gemini_api_key,
            gemini_model: get_env_or("GEMINI_MODEL", "gemini-1.5-flash"),
            gemini_base_url: get_env_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            remote_timeout_secs: get_env_parse_or("REMOTE_TIMEOUT_SECS", 30)?,
            min_content_length: get_env_parse_or("MIN_CONTENT_LENGTH", 50)?,
            max_questions_per_kind: get_env_parse_or("MAX_QUESTIONS_PER_KIND", 20)?,
            max_upload_bytes: get_env_parse_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            session_ttl_secs: get_env_parse_or("SESSION_TTL_SECS", 3600)?,
            log_format,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "0.0.0.0:8501".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            remote_timeout_secs: 30,
            min_content_length: 50,
            max_questions_per_kind: 20,
            max_upload_bytes: 20 * 1024 * 1024,
            session_ttl_secs: 3600,
            log_format: LogFormat::Text,
        }
    }
}

/// Empty values count as absent.
fn get_env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn get_env_or(name: &str, default: &str) -> String {
    get_env_opt(name).unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

impl Config {
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
