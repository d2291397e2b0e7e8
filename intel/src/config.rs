use crate::locale::Language;
use anyhow::{Context, Result};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub mail_recipient: String,
    pub mail_preview_chars: usize,
    pub default_language: Language,
    pub dashboard_port: u16,
    pub report_utc_offset_hours: i32, // report date is stamped in this zone
}

impl Config {
    /// Load config from a specific .env file, or the default `.env` if None.
    pub fn from_env_file(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                dotenvy::from_filename(p).with_context(|| format!("Failed to load {p}"))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Self::build_from_env()
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::build_from_env()
    }

    fn build_from_env() -> Result<Self> {
        let gemini_api_key = env("GEMINI_API_KEY", "");
        if gemini_api_key.is_empty() {
            anyhow::bail!("GEMINI_API_KEY must be set");
        }

        let language = env("DEFAULT_LANGUAGE", "zh-tw");
        let default_language = Language::from_code(&language)
            .with_context(|| format!("Invalid DEFAULT_LANGUAGE: {language}"))?;

        let report_utc_offset_hours: i32 = env_parse("REPORT_UTC_OFFSET_HOURS", "8")?;
        if !(-23..=23).contains(&report_utc_offset_hours) {
            anyhow::bail!("REPORT_UTC_OFFSET_HOURS out of range: {report_utc_offset_hours}");
        }

        Ok(Self {
            gemini_api_key,
            gemini_model: env("GEMINI_MODEL", "gemini-2.5-flash"),
            max_attempts: env_parse("MAX_ATTEMPTS", "3")?,
            retry_delay_secs: env_parse("RETRY_DELAY_SECS", "30")?,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", "120")?,
            mail_recipient: env("MAIL_RECIPIENT", ""),
            mail_preview_chars: env_parse("MAIL_PREVIEW_CHARS", "1000")?,
            default_language,
            dashboard_port: env_parse("DASHBOARD_PORT", "3000")?,
            report_utc_offset_hours,
        })
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let val = env(key, default);
    val.trim()
        .parse()
        .with_context(|| format!("Invalid value for {key}: {val}"))
}
