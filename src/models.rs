//! Core data models used throughout the report pipeline.
//!
//! These types carry a document from its source (upload or web fetch),
//! through text extraction and per-section summarization, up to the point
//! where [`crate::report`] assembles them into Markdown.

use std::fmt;

/// Prefix of the text rendered in place of a section whose summarization failed.
pub const FAILURE_PLACEHOLDER: &str = "⚠️ 要約に失敗しました";

/// Where a [`SourceDocument`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Uploaded,
    Fetched(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Uploaded => write!(f, "uploaded"),
            Origin::Fetched(url) => write!(f, "fetched:{}", url),
        }
    }
}

/// Raw bytes of one PDF plus its origin tag. Immutable once resolved.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    bytes: Vec<u8>,
    origin: Origin,
}

impl SourceDocument {
    pub(crate) fn new(bytes: Vec<u8>, origin: Origin) -> Self {
        Self { bytes, origin }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Plain text of a whole document, pages concatenated in physical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    /// Returns at most `limit` characters from the start, never splitting a
    /// code point. `None` returns the whole text.
    pub fn prefix(&self, limit: Option<usize>) -> &str {
        match limit {
            None => &self.0,
            Some(n) => match self.0.char_indices().nth(n) {
                Some((byte_idx, _)) => &self.0[..byte_idx],
                None => &self.0,
            },
        }
    }
}

/// Analytical dimension a summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Business,
    Financial,
    Custom,
}

/// One summarization call's input. Lives only for the duration of the call.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub kind: TopicKind,
    /// Extra topic for business summaries, or the topic itself for custom ones.
    pub topic_label: Option<&'a str>,
    pub source_text: &'a ExtractedText,
    pub truncation_limit: Option<usize>,
}

/// Result of summarizing one section: the model's text, or why it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    Summary(String),
    Failed(String),
}

impl SectionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SectionOutcome::Failed(_))
    }

    /// Text rendered into the report for this section.
    pub fn render(&self) -> String {
        match self {
            SectionOutcome::Summary(text) => text.clone(),
            SectionOutcome::Failed(detail) => format!("{}: {}", FAILURE_PLACEHOLDER, detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub label: String,
    pub outcome: SectionOutcome,
}

impl SummaryResult {
    pub fn new(label: impl Into<String>, outcome: SectionOutcome) -> Self {
        Self {
            label: label.into(),
            outcome,
        }
    }

    pub fn text(&self) -> String {
        self.outcome.render()
    }
}

/// Insertion-ordered label → [`SummaryResult`] map.
///
/// Inserting an existing label replaces the stored result but keeps the
/// label's original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    entries: Vec<SummaryResult>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, result: SummaryResult) {
        match self.entries.iter_mut().find(|e| e.label == result.label) {
            Some(existing) => *existing = result,
            None => self.entries.push(result),
        }
    }

    pub fn get(&self, label: &str) -> Option<&SummaryResult> {
        self.entries.iter().find(|e| e.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SummaryResult> {
        self.entries.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// User-selected options for the next report generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub include_financial: bool,
    /// Extra topics in the order the user listed them. Blank entries dropped.
    pub custom_topics: Vec<String>,
}

impl ReportOptions {
    pub fn new<I, S>(include_financial: bool, custom_topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let custom_topics = custom_topics
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            include_financial,
            custom_topics,
        }
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_financial: true,
            custom_topics: Vec::new(),
        }
    }
}
