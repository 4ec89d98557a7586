use ego_tree::NodeId;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::extract::rules::{ExtractionRules, SelectorRule};
use crate::extract::ExtractedArticle;

static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p").expect("Failed to parse paragraph selector")
});

/// Punctuation kept by the cleanup pass; everything else non-alphanumeric becomes a space.
const KEPT_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '(', ')', '"', '\'', '-', '_'];

struct CompiledRule {
    source: String,
    selector: Selector,
    min_len: usize,
}

/// Heuristic article extractor over a parsed HTML document.
///
/// Selectors are compiled once from [`ExtractionRules`]; a parser is cheap to
/// share behind an `Arc`.
pub struct HtmlParser {
    rules: ExtractionRules,
    remove: Vec<Selector>,
    nested_remove: Vec<Selector>,
    title: Vec<CompiledRule>,
    content: Vec<CompiledRule>,
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| AppError::ConfigError(format!("Invalid selector '{}': {:?}", selector, e)))
}

fn compile_all(selectors: &[String]) -> Result<Vec<Selector>> {
    selectors.iter().map(|s| compile(s)).collect()
}

fn compile_rules(rules: &[SelectorRule]) -> Result<Vec<CompiledRule>> {
    rules
        .iter()
        .map(|rule| {
            Ok(CompiledRule {
                source: rule.selector.clone(),
                selector: compile(&rule.selector)?,
                min_len: rule.min_len,
            })
        })
        .collect()
}

/// Collapses every whitespace run to a single space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn element_by_id(document: &Html, id: NodeId) -> Option<ElementRef<'_>> {
    document.tree.get(id).and_then(ElementRef::wrap)
}

fn detach_all(document: &mut Html, ids: Vec<NodeId>) {
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|n| haystack.contains(&n.to_lowercase()))
}

impl HtmlParser {
    pub fn new(rules: ExtractionRules) -> Result<Self> {
        Ok(Self {
            remove: compile_all(&rules.remove)?,
            nested_remove: compile_all(&rules.nested_remove)?,
            title: compile_rules(&rules.title)?,
            content: compile_rules(&rules.content)?,
            rules,
        })
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    /// Extracts the title and main text of an article page.
    pub fn parse(&self, html: &str, source_url: &str) -> Result<ExtractedArticle> {
        debug!(bytes = html.len(), url = source_url, "Parsing HTML content");

        if let Some(marker) = self.rules.block_markers.iter().find(|m| html.contains(m.as_str())) {
            debug!(marker = marker.as_str(), "Block marker found, rejecting page");
            return Err(AppError::ContentError(
                "Access denied by the website. Try the text input mode instead.".to_string(),
            ));
        }

        let mut document = Html::parse_document(html);
        let unwanted: Vec<NodeId> = self
            .remove
            .iter()
            .flat_map(|selector| document.select(selector).map(|el| el.id()))
            .collect();
        detach_all(&mut document, unwanted);

        let title = self.find_title(&document);
        debug!(title = title.as_deref().unwrap_or(""), "Extracted title");

        let mut content = self.find_content(&mut document);
        if char_len(&content) < self.rules.fallback_below {
            let paragraphs = self.join_paragraphs(&document);
            if char_len(&paragraphs) > char_len(&content) {
                debug!(chars = char_len(&paragraphs), "Using paragraph fallback");
                content = paragraphs;
            }
        }

        let content = self.clean(&content);
        let length = char_len(&content);
        if length < self.rules.min_content_len {
            return Err(AppError::ContentError(format!(
                "content too short ({} characters). The article might be behind a paywall, \
                 loaded dynamically with JavaScript or protected from automated access. \
                 Try copying the text and using text input mode.",
                length
            )));
        }

        let content = if length > self.rules.max_content_len {
            content.chars().take(self.rules.max_content_len).collect::<String>().trim_end().to_string()
        } else {
            content
        };

        Ok(ExtractedArticle {
            title,
            content,
            source_url: source_url.to_string(),
        })
    }

    fn find_title(&self, document: &Html) -> Option<String> {
        for rule in &self.title {
            let Some(element) = document.select(&rule.selector).next() else {
                continue;
            };
            let text = element_text(element);
            if char_len(&text) > rule.min_len && !contains_any(&text, &self.rules.title_reject) {
                return Some(text);
            }
        }
        None
    }

    /// Longest candidate wins; equal lengths keep the first one seen.
    fn find_content(&self, document: &mut Html) -> String {
        let mut best = String::new();
        let mut best_len = 0;

        for rule in &self.content {
            let candidates: Vec<NodeId> = document.select(&rule.selector).map(|el| el.id()).collect();

            for id in candidates {
                let nested: Vec<NodeId> = match element_by_id(document, id) {
                    Some(element) => self
                        .nested_remove
                        .iter()
                        .flat_map(|selector| element.select(selector).map(|el| el.id()))
                        .collect(),
                    None => continue,
                };
                detach_all(document, nested);

                let Some(element) = element_by_id(document, id) else {
                    continue;
                };
                let text = element_text(element);
                let length = char_len(&text);
                if length > best_len && length > rule.min_len {
                    debug!(selector = rule.source.as_str(), chars = length, "Better content found");
                    best = text;
                    best_len = length;
                }
            }

            if best_len > self.rules.good_enough_len {
                break;
            }
        }

        best
    }

    fn join_paragraphs(&self, document: &Html) -> String {
        let rule = &self.rules.paragraphs;
        document
            .select(&PARAGRAPH_SELECTOR)
            .map(element_text)
            .filter(|text| char_len(text) > rule.min_len && !contains_any(text, &rule.reject))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn clean(&self, content: &str) -> String {
        if !self.rules.strip_punctuation {
            return normalize_whitespace(content);
        }
        let stripped: String = content
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c.is_whitespace() || KEPT_PUNCTUATION.contains(&c) {
                    c
                } else {
                    ' '
                }
            })
            .collect();
        normalize_whitespace(&stripped)
    }
}
