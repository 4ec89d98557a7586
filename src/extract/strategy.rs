use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use reqwest::header::USER_AGENT;
use url::Url;

use crate::error::{AppError, Result};

const BOT_USER_AGENT: &str = "Mozilla/5.0 (compatible; NewsBot/1.0)";

// Shared client so every strategy reuses the same connection pool
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

/// One way of getting the raw HTML of a page.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the page body as HTML, or an error if the fetch failed.
    async fn fetch(&self, url: &Url) -> Result<String>;
}

/// How a strategy turns the article URL into the URL it actually requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Request the article itself.
    Direct,
    /// Append the raw article URL to a proxy base.
    Prefix(String),
    /// Append the percent-encoded article URL to a proxy base.
    Query(String),
    /// Like `Query`, but the proxy answers with JSON holding the HTML in `field`.
    JsonEnvelope { base: String, field: String },
}

fn encode(url: &Url) -> String {
    url::form_urlencoded::byte_serialize(url.as_str().as_bytes()).collect()
}

impl Endpoint {
    pub fn request_url(&self, target: &Url) -> String {
        match self {
            Endpoint::Direct => target.to_string(),
            Endpoint::Prefix(base) => format!("{}{}", base, target),
            Endpoint::Query(base) => format!("{}{}", base, encode(target)),
            Endpoint::JsonEnvelope { base, .. } => format!("{}{}", base, encode(target)),
        }
    }
}

/// The built-in strategies, named so the order can be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    AllOrigins,
    CorsAnywhere,
    ThingProxy,
    Direct,
    CorsProxyIo,
}

impl StrategyKind {
    pub const DEFAULT_ORDER: [StrategyKind; 5] = [
        StrategyKind::AllOrigins,
        StrategyKind::CorsAnywhere,
        StrategyKind::ThingProxy,
        StrategyKind::Direct,
        StrategyKind::CorsProxyIo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::AllOrigins => "allorigins",
            StrategyKind::CorsAnywhere => "cors-anywhere",
            StrategyKind::ThingProxy => "thingproxy",
            StrategyKind::Direct => "direct",
            StrategyKind::CorsProxyIo => "corsproxy",
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            StrategyKind::AllOrigins => Endpoint::JsonEnvelope {
                base: "https://api.allorigins.win/get?url=".to_string(),
                field: "contents".to_string(),
            },
            StrategyKind::CorsAnywhere => Endpoint::Prefix("https://cors-anywhere.herokuapp.com/".to_string()),
            StrategyKind::ThingProxy => Endpoint::Prefix("https://thingproxy.freeboard.io/fetch/".to_string()),
            StrategyKind::Direct => Endpoint::Direct,
            StrategyKind::CorsProxyIo => Endpoint::Query("https://corsproxy.io/?".to_string()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        StrategyKind::DEFAULT_ORDER
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::ConfigError(format!("Unknown extraction strategy: {}", s)))
    }
}

/// A reqwest-backed strategy for one endpoint.
pub struct HttpStrategy {
    name: String,
    endpoint: Endpoint,
    headers: Vec<(&'static str, &'static str)>,
    timeout: Duration,
}

impl HttpStrategy {
    pub fn new(name: impl Into<String>, endpoint: Endpoint, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            endpoint,
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn from_kind(kind: StrategyKind, timeout: Duration) -> Self {
        let strategy = Self::new(kind.name(), kind.endpoint(), timeout);
        match kind {
            StrategyKind::CorsAnywhere => strategy.with_header("X-Requested-With", "XMLHttpRequest"),
            _ => strategy,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl FetchStrategy for HttpStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let mut request = CLIENT
            .get(self.endpoint.request_url(url))
            .timeout(self.timeout)
            .header(USER_AGENT, BOT_USER_AGENT);
        for (name, value) in &self.headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::FetchError(format!("{} failed: {}", self.name, status)));
        }

        match &self.endpoint {
            Endpoint::JsonEnvelope { field, .. } => {
                let envelope: serde_json::Value = response.json().await?;
                envelope
                    .get(field)
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .ok_or_else(|| AppError::FetchError(format!("{} returned no '{}' field", self.name, field)))
            }
            _ => Ok(response.text().await?),
        }
    }
}
