//! Article content extraction.
//!
//! ```text
//! URL → ExtractionChain → FetchStrategy (proxy / direct) → HtmlParser → ExtractedArticle
//! ```
//!
//! Strategies are tried one at a time in their configured order; the first
//! one whose page parses into enough text wins.

mod chain;
mod parser;
mod rules;
mod strategy;

pub use chain::{validate_url, ExtractionChain, MIN_USABLE_CONTENT};
pub use parser::{normalize_whitespace, HtmlParser};
pub use rules::{ExtractionRules, ParagraphRule, SelectorRule, DEFAULT_MAX_CONTENT_LEN, DEFAULT_MIN_CONTENT_LEN};
pub use strategy::{Endpoint, FetchStrategy, HttpStrategy, StrategyKind};

use serde::Serialize;

/// Text pulled out of an article page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub content: String,
    pub source_url: String,
}
