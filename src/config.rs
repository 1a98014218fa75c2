use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "https://open.er-api.com/v6/latest/USD";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub json_file: PathBuf,
    pub log_dir: PathBuf,
    pub redis_url: String,
    pub cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(5),
            max_attempts: 5,
            base_delay: Duration::from_secs(60),
            json_file: PathBuf::from("currency_rates.json"),
            log_dir: PathBuf::from("logs"),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let max_attempts = parse_or(&lookup, "FX_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            anyhow::bail!("FX_MAX_ATTEMPTS must be at least 1");
        }
        let cache_ttl_secs = parse_or(&lookup, "FX_CACHE_TTL_SECS", defaults.cache_ttl.as_secs())?;
        if cache_ttl_secs == 0 {
            anyhow::bail!("FX_CACHE_TTL_SECS must be at least 1");
        }

        Ok(Self {
            api_url: lookup("FX_API_URL").unwrap_or(defaults.api_url),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "FX_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            max_attempts,
            base_delay: Duration::from_secs(parse_or(
                &lookup,
                "FX_BASE_DELAY_SECS",
                defaults.base_delay.as_secs(),
            )?),
            json_file: lookup("FX_JSON_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.json_file),
            log_dir: lookup("FX_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", name, value)),
        None => Ok(default),
    }
}
