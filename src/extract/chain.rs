use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::extract::parser::HtmlParser;
use crate::extract::strategy::{FetchStrategy, HttpStrategy, StrategyKind};
use crate::extract::ExtractedArticle;

/// Content shorter than this does not count as a successful extraction.
pub const MIN_USABLE_CONTENT: usize = 200;

const EXHAUSTED_MESSAGE: &str = "Unable to extract article content. This could be due to:\n\
    • Website blocking automated access\n\
    • Paywall or login required\n\
    • Content loaded dynamically\n\n\
    Try using the TEXT input mode instead - copy and paste the article text directly.";

/// Parses and checks that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        scheme => Err(AppError::ValidationError(format!(
            "Invalid URL format (unsupported scheme '{}'). Please check the URL and try again.",
            scheme
        ))),
    }
}

/// Ordered fallback list of fetch strategies sharing one parser.
pub struct ExtractionChain {
    strategies: Vec<Box<dyn FetchStrategy>>,
    parser: Arc<HtmlParser>,
    timeout: Duration,
    min_usable: usize,
}

impl ExtractionChain {
    pub fn new(parser: Arc<HtmlParser>, timeout: Duration) -> Self {
        Self {
            strategies: Vec::new(),
            parser,
            timeout,
            min_usable: MIN_USABLE_CONTENT,
        }
    }

    /// Builds a chain of the built-in HTTP strategies in the given order.
    pub fn from_kinds(kinds: &[StrategyKind], parser: Arc<HtmlParser>, timeout: Duration) -> Self {
        kinds.iter().fold(Self::new(parser, timeout), |chain, kind| {
            chain.with_strategy(HttpStrategy::from_kind(*kind, timeout))
        })
    }

    pub fn with_strategy(mut self, strategy: impl FetchStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn with_min_usable(mut self, min_usable: usize) -> Self {
        self.min_usable = min_usable;
        self
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Tries each strategy once, in order, and returns the first usable article.
    pub async fn extract(&self, url: &str) -> Result<ExtractedArticle> {
        let target = validate_url(url)?;
        info!(url = %target, "Starting article extraction");

        let total = self.strategies.len();
        for (index, strategy) in self.strategies.iter().enumerate() {
            let started = Instant::now();
            info!(strategy = strategy.name(), "Trying extraction method {}/{}", index + 1, total);

            let html = match tokio::time::timeout(self.timeout, strategy.fetch(&target)).await {
                Ok(Ok(html)) => html,
                Ok(Err(e)) => {
                    warn!(strategy = strategy.name(), error = %e, "Fetch failed");
                    continue;
                }
                Err(_) => {
                    warn!(strategy = strategy.name(), "Fetch timed out after {:?}", self.timeout);
                    continue;
                }
            };

            match self.parser.parse(&html, target.as_str()) {
                Ok(article) if article.content.chars().count() >= self.min_usable => {
                    info!(
                        strategy = strategy.name(),
                        chars = article.content.len(),
                        "Extraction succeeded in {:?}",
                        started.elapsed()
                    );
                    return Ok(article);
                }
                Ok(article) => {
                    warn!(
                        strategy = strategy.name(),
                        chars = article.content.len(),
                        "Insufficient content"
                    );
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Parsing failed");
                }
            }
        }

        Err(AppError::FetchError(EXHAUSTED_MESSAGE.to_string()))
    }
}
