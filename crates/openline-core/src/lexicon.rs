//! # Lexicon
//!
//! Sentence splitting, tokenization and marker-based sentence classification.
//!
//! Classification sits behind the [`SentenceClassifier`] trait so that a
//! different strategy can replace the default lexical tables without touching
//! the extractor.

use crate::{EdgeRel, NodeType};
use regex::Regex;
use std::sync::LazyLock;

// =============================================================================
// MARKER TABLES
// =============================================================================

/// Default support markers.
pub const SUPPORT_MARKERS: &[&str] = &["because", "therefore", "so that", "so,", "hence", "thus"];

/// Default contradiction markers.
pub const CONTRA_MARKERS: &[&str] = &[
    "however",
    "but",
    "nevertheless",
    "nonetheless",
    "although",
    "yet",
];

/// Default citation markers.
pub const CITE_MARKERS: &[&str] = &[
    "doi:",
    "pmid",
    "pmcid",
    "according to",
    "as cited",
    "see:",
    "arxiv",
    "usc",
    "§",
    "http://",
    "https://",
];

static GOV_EDU_URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"https?://[^\s/]+\.(?:gov|edu)(?:[/:?#\s]|$)").ok());

// =============================================================================
// TEXT HELPERS
// =============================================================================

/// Split text into sentences.
///
/// Boundaries are `.`, `!` or `?` followed by whitespace, and `•` bullets.
/// Terminal punctuation stays with its sentence; empty fragments are dropped.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '•' {
            push_fragment(&mut sentences, &mut current);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            push_fragment(&mut sentences, &mut current);
        }
    }
    push_fragment(&mut sentences, &mut current);

    sentences
}

fn push_fragment(sentences: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}

/// Tokenize: maximal runs of `[A-Za-z0-9_'-]`, lower-cased.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '\'' | '-')))
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Does the lower-cased text contain any citation marker?
#[must_use]
pub fn has_cite_marker(text: &str) -> bool {
    contains_any(&text.to_lowercase(), CITE_MARKERS)
}

fn contains_any(lowered: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| lowered.contains(m))
}

/// Authority of the strongest citation in a text.
///
/// - DOI / PMID / PMCID, or a `.gov` / `.edu` URL: 1.0
/// - arXiv / USC: 0.85
/// - wikipedia.org: 0.70
/// - any other URL: 0.30
/// - nothing: 0.0
#[must_use]
pub fn authority_score(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    if contains_any(&lowered, &["doi:", "pmcid", "pmid"]) {
        return 1.0;
    }
    if GOV_EDU_URL
        .as_ref()
        .is_some_and(|re| re.is_match(&lowered))
    {
        return 1.0;
    }
    if contains_any(&lowered, &["arxiv", "usc"]) {
        return 0.85;
    }
    if lowered.contains("wikipedia.org") {
        return 0.70;
    }
    if contains_any(&lowered, &["http://", "https://"]) {
        return 0.30;
    }
    0.0
}

// =============================================================================
// CLASSIFIER
// =============================================================================

/// Strategy for classifying non-lead sentences.
pub trait SentenceClassifier: Send + Sync {
    /// Node type emitted for a sentence that becomes a graph node.
    fn classify(&self, sentence: &str) -> NodeType;

    /// Does the sentence signal a contradiction?
    fn contradicts(&self, sentence: &str) -> bool;

    /// Does the sentence signal support?
    fn supports(&self, sentence: &str) -> bool;

    /// Does the sentence carry a citation?
    fn cites(&self, sentence: &str) -> bool;

    /// Strongest relation the sentence signals: contradiction beats support.
    fn relate(&self, sentence: &str) -> Option<EdgeRel> {
        if self.contradicts(sentence) {
            Some(EdgeRel::Contradicts)
        } else if self.supports(sentence) {
            Some(EdgeRel::Supports)
        } else {
            None
        }
    }
}

/// Case-insensitive substring matcher over swappable marker tables.
#[derive(Debug, Clone)]
pub struct LexicalClassifier {
    support: Vec<String>,
    contra: Vec<String>,
    cite: Vec<String>,
}

impl Default for LexicalClassifier {
    fn default() -> Self {
        Self::new(SUPPORT_MARKERS, CONTRA_MARKERS, CITE_MARKERS)
    }
}

impl LexicalClassifier {
    /// Build a classifier from custom marker tables.
    ///
    /// Markers are lower-cased on construction.
    #[must_use]
    pub fn new(support: &[&str], contra: &[&str], cite: &[&str]) -> Self {
        let lower = |table: &[&str]| table.iter().map(|m| m.to_lowercase()).collect();
        Self {
            support: lower(support),
            contra: lower(contra),
            cite: lower(cite),
        }
    }

    fn matches(table: &[String], sentence: &str) -> bool {
        let lowered = sentence.to_lowercase();
        table.iter().any(|m| lowered.contains(m.as_str()))
    }
}

impl SentenceClassifier for LexicalClassifier {
    fn classify(&self, _sentence: &str) -> NodeType {
        NodeType::Evidence
    }

    fn contradicts(&self, sentence: &str) -> bool {
        Self::matches(&self.contra, sentence)
    }

    fn supports(&self, sentence: &str) -> bool {
        Self::matches(&self.support, sentence)
    }

    fn cites(&self, sentence: &str) -> bool {
        Self::matches(&self.cite, sentence)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_punctuation_and_drops_empty() {
        let s = split_sentences("  First one. Second!  Third?   ");
        assert_eq!(s, vec!["First one.", "Second!", "Third?"]);
    }

    #[test]
    fn split_ignores_inner_dots() {
        let s = split_sentences("See doi:10.1000/xyz for details. Done");
        assert_eq!(s.len(), 2);
        assert_eq!(s[0], "See doi:10.1000/xyz for details.");
    }

    #[test]
    fn split_on_bullets() {
        let s = split_sentences("Plan • step one • step two");
        assert_eq!(s, vec!["Plan", "step one", "step two"]);
    }

    #[test]
    fn empty_text_has_no_sentences() {
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn tokenizer_keeps_apostrophes_and_hyphens() {
        assert_eq!(
            tokenize("It's a well-known FACT, ok_1!"),
            vec!["it's", "a", "well-known", "fact", "ok_1"]
        );
    }

    #[test]
    fn authority_tiers() {
        assert!((authority_score("per doi:10.1/x") - 1.0).abs() < f64::EPSILON);
        assert!((authority_score("https://data.cdc.gov/report") - 1.0).abs() < f64::EPSILON);
        assert!((authority_score("see arXiv:2101.0001") - 0.85).abs() < f64::EPSILON);
        assert!((authority_score("https://en.wikipedia.org/wiki/X") - 0.70).abs() < f64::EPSILON);
        assert!((authority_score("https://example.com/a") - 0.30).abs() < f64::EPSILON);
        assert!(authority_score("no sources here").abs() < f64::EPSILON);
    }

    #[test]
    fn relate_prefers_contradiction() {
        let c = LexicalClassifier::default();
        assert_eq!(
            c.relate("But because of that, it fails."),
            Some(EdgeRel::Contradicts)
        );
        assert_eq!(c.relate("Hence the result."), Some(EdgeRel::Supports));
        assert_eq!(c.relate("Plain statement."), None);
        assert!(c.cites("According to the report."));
    }

    #[test]
    fn custom_tables_are_case_insensitive() {
        let c = LexicalClassifier::new(&["Given"], &["Except"], &["Ref:"]);
        assert!(c.supports("given the data"));
        assert!(c.contradicts("EXCEPT here"));
        assert!(c.cites("ref: 12"));
        assert!(!c.supports("because"));
    }
}
