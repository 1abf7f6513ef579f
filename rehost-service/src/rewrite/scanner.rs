//! Markdown image reference scanning.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// `![alt](url)` with both groups matched lazily, never across a line break.
static IMAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("image pattern is valid"));

/// A single image reference found in a Markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference<'a> {
    pub alt_text: &'a str,
    pub original_url: &'a str,
    /// Byte offset of the leading `!`
    pub span_start: usize,
    /// Byte offset just past the closing `)`
    pub span_end: usize,
    /// The full matched text, exactly as it appears in the document
    pub matched: &'a str,
}

impl<'a> ImageReference<'a> {
    fn from_captures(caps: Captures<'a>) -> Self {
        let whole = caps.get(0).expect("group 0 always participates");
        Self {
            alt_text: caps.get(1).map_or("", |m| m.as_str()),
            original_url: caps.get(2).map_or("", |m| m.as_str()),
            span_start: whole.start(),
            span_end: whole.end(),
            matched: whole.as_str(),
        }
    }

    /// Rebuild this reference pointing at a different URL.
    pub fn with_url(&self, url: &str) -> String {
        format!("![{}]({})", self.alt_text, url)
    }
}

/// Lazily yield every image reference in `text`, left to right.
///
/// Each call scans from the start of the text; there is no state shared
/// between calls.
pub fn scan_references(text: &str) -> impl Iterator<Item = ImageReference<'_>> {
    IMAGE_PATTERN
        .captures_iter(text)
        .map(ImageReference::from_captures)
}
