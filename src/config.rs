use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::extract::{ExtractionRules, StrategyKind};
use crate::llm::LlmProvider;

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// Overrides the provider's API root (Gemini only).
    pub base_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub data_dir: PathBuf,
    /// Key from the environment, used until one is saved through the API.
    pub api_key: Option<String>,
    pub llm: LlmConfig,
    pub strategies: Vec<StrategyKind>,
    pub fetch_timeout: Duration,
    pub request_timeout: Duration,
    pub rules: ExtractionRules,
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e)))
}

fn secs(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> Result<Duration> {
    let secs = match lookup(name) {
        Some(value) => parse_number::<u64>(name, &value)?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Builds the configuration from any key lookup (the process environment in `load`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "3000".to_string());
        let port = parse_number::<u16>("port", &port)?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
        let server_addr = SocketAddr::new(ip, port);

        let provider = match lookup("LLM_PROVIDER") {
            Some(name) => name.parse::<LlmProvider>()?,
            None => LlmProvider::Gemini,
        };
        let api_key = match provider {
            LlmProvider::Gemini => lookup("GEMINI_API_KEY"),
            LlmProvider::OpenRouter => lookup("OPENROUTER_API_KEY"),
        };
        let llm = LlmConfig {
            provider,
            model: lookup("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            base_url: lookup("LLM_BASE_URL"),
            timeout: secs(&lookup, "LLM_TIMEOUT_SECS", 60)?,
        };

        let data_dir = match lookup("DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or_else(|| AppError::ConfigError("Could not find data directory; set DATA_DIR".into()))?
                .join("daily-bugle"),
        };

        let strategies = match lookup("EXTRACTION_STRATEGIES") {
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(StrategyKind::from_str)
                .collect::<Result<Vec<_>>>()?,
            None => StrategyKind::DEFAULT_ORDER.to_vec(),
        };
        if strategies.is_empty() {
            return Err(AppError::ConfigError("EXTRACTION_STRATEGIES names no strategy".into()));
        }

        let mut rules = match lookup("EXTRACTION_RULES_FILE") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| AppError::ConfigError(format!("Cannot read {}: {}", path, e)))?;
                serde_json::from_str::<ExtractionRules>(&raw)
                    .map_err(|e| AppError::ConfigError(format!("Invalid rules in {}: {}", path, e)))?
            }
            None => ExtractionRules::default(),
        };
        if let Some(min) = lookup("MIN_CONTENT_CHARS") {
            rules.min_content_len = parse_number("MIN_CONTENT_CHARS", &min)?;
        }
        if let Some(max) = lookup("MAX_CONTENT_CHARS") {
            rules.max_content_len = parse_number("MAX_CONTENT_CHARS", &max)?;
        }
        if rules.max_content_len < rules.min_content_len {
            return Err(AppError::ConfigError(
                "MAX_CONTENT_CHARS must not be smaller than MIN_CONTENT_CHARS".into(),
            ));
        }

        Ok(Config {
            server_addr,
            data_dir,
            api_key,
            llm,
            strategies,
            fetch_timeout: secs(&lookup, "FETCH_TIMEOUT_SECS", 10)?,
            request_timeout: secs(&lookup, "REQUEST_TIMEOUT_SECS", 90)?,
            rules,
        })
    }
}
