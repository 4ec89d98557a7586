use serde::{Deserialize, Serialize};

/// A selector paired with the minimum text length a match must exceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRule {
    pub selector: String,
    pub min_len: usize,
}

impl SelectorRule {
    pub fn new(selector: impl Into<String>, min_len: usize) -> Self {
        Self {
            selector: selector.into(),
            min_len,
        }
    }
}

/// Settings for the paragraph-join fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphRule {
    /// Paragraphs must be longer than this to be kept.
    pub min_len: usize,
    /// Paragraphs containing any of these (case-insensitive) are dropped.
    pub reject: Vec<String>,
}

impl Default for ParagraphRule {
    fn default() -> Self {
        Self {
            min_len: 50,
            reject: vec!["cookie".to_string(), "subscribe".to_string()],
        }
    }
}

/// Ordered heuristics driving [`HtmlParser`](super::HtmlParser).
///
/// Order inside `title` and `content` is the search priority. Swap or
/// reorder entries to tune extraction for a particular site family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// Raw substrings that mark a blocked or denied page.
    pub block_markers: Vec<String>,
    /// Elements removed from the whole document before any search.
    pub remove: Vec<String>,
    /// Elements removed from inside each content candidate before measuring.
    pub nested_remove: Vec<String>,
    pub title: Vec<SelectorRule>,
    /// Titles containing any of these (case-insensitive) are skipped.
    pub title_reject: Vec<String>,
    pub content: Vec<SelectorRule>,
    /// Stop searching further selectors once the best candidate exceeds this.
    pub good_enough_len: usize,
    /// Below this the paragraph fallback is tried.
    pub fallback_below: usize,
    pub paragraphs: ParagraphRule,
    pub min_content_len: usize,
    pub max_content_len: usize,
    /// Replace characters outside letters, digits and basic punctuation.
    pub strip_punctuation: bool,
}

const DEFAULT_REMOVE: &[&str] = &[
    "script",
    "style",
    "noscript",
    "nav",
    "header",
    "footer",
    "aside",
    ".ad",
    ".ads",
    ".advertisement",
    "[class*=\"advert\"]",
    "[id*=\"advert\"]",
    "[class*=\"banner\"]",
    ".social-share",
    ".comments",
    ".sidebar",
    ".related-articles",
    ".navigation",
    ".popup",
    ".modal",
    ".overlay",
    ".cookie-notice",
];

const DEFAULT_NESTED_REMOVE: &[&str] = &[
    "script",
    "style",
    ".ad",
    ".advertisement",
    "[class*=\"advert\"]",
    ".social-share",
    ".comments",
    "nav",
    "aside",
    ".sidebar",
    ".author-bio",
    ".related-posts",
    ".newsletter-signup",
];

const DEFAULT_TITLE: &[&str] = &[
    "h1",
    ".title",
    ".headline",
    ".article-title",
    ".post-title",
    "[class*=\"headline\"]",
    "[class*=\"title\"]",
    "title",
];

const DEFAULT_CONTENT: &[&str] = &[
    "article",
    "[role=\"main\"]",
    ".content",
    ".article-content",
    ".post-content",
    ".entry-content",
    ".story-content",
    "main",
    ".story-body",
    ".article-body",
    ".post-body",
    ".content-body",
    "[class*=\"content\"]",
    "[class*=\"article\"]",
    "[class*=\"story\"]",
    "[class*=\"post-text\"]",
    "[class*=\"body-text\"]",
];

pub const DEFAULT_MIN_CONTENT_LEN: usize = 200;
pub const DEFAULT_MAX_CONTENT_LEN: usize = 12_000;

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            block_markers: owned(&["Access Denied", "403 Forbidden"]),
            remove: owned(DEFAULT_REMOVE),
            nested_remove: owned(DEFAULT_NESTED_REMOVE),
            title: DEFAULT_TITLE.iter().map(|s| SelectorRule::new(*s, 10)).collect(),
            title_reject: owned(&["404", "error", "access denied"]),
            content: DEFAULT_CONTENT.iter().map(|s| SelectorRule::new(*s, 500)).collect(),
            good_enough_len: 1000,
            fallback_below: 500,
            paragraphs: ParagraphRule::default(),
            min_content_len: DEFAULT_MIN_CONTENT_LEN,
            max_content_len: DEFAULT_MAX_CONTENT_LEN,
            strip_punctuation: true,
        }
    }
}

impl ExtractionRules {
    pub fn with_limits(mut self, min_content_len: usize, max_content_len: usize) -> Self {
        self.min_content_len = min_content_len;
        self.max_content_len = max_content_len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priority_order() {
        let rules = ExtractionRules::default();
        assert_eq!(rules.title.first().map(|r| r.selector.as_str()), Some("h1"));
        assert_eq!(rules.title.last().map(|r| r.selector.as_str()), Some("title"));
        assert_eq!(rules.content.first().map(|r| r.selector.as_str()), Some("article"));
        assert!(rules.content.iter().all(|r| r.min_len == 500));
    }

    #[test]
    fn test_with_limits() {
        let rules = ExtractionRules::default().with_limits(100, 5000);
        assert_eq!(rules.min_content_len, 100);
        assert_eq!(rules.max_content_len, 5000);
    }

    #[test]
    fn test_partial_rules_deserialize_with_defaults() {
        let rules: ExtractionRules =
            serde_json::from_str(r#"{"good_enough_len": 2000, "strip_punctuation": false}"#).unwrap();
        assert_eq!(rules.good_enough_len, 2000);
        assert!(!rules.strip_punctuation);
        assert_eq!(rules.min_content_len, DEFAULT_MIN_CONTENT_LEN);
    }

    #[test]
    fn test_partial_paragraph_rule() {
        let rules: ExtractionRules = serde_json::from_str(r#"{"paragraphs": {"min_len": 30}}"#).unwrap();
        assert_eq!(rules.paragraphs.min_len, 30);
        assert_eq!(rules.paragraphs.reject, ParagraphRule::default().reject);
        assert_eq!(rules.title, ExtractionRules::default().title);
    }
}
