//! Quote-to-source matching for evidence highlighting.
//!
//! Extraction quotes rarely survive layout intact: line wraps, indentation and
//! sentence punctuation drift between the model's copy and the source. The
//! matcher builds a loose, case-insensitive pattern from the quote so that any
//! whitespace in the quote matches a whitespace run (optionally wrapped in
//! punctuation) in the source.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Separator placed between quote words: at least one whitespace character,
/// optionally surrounded by punctuation.
const FLEXIBLE_GAP: &str = r"[\s\p{P}]*\s[\s\p{P}]*";

/// Message callers show when a quote could not be located.
pub const QUOTE_NOT_FOUND_NOTICE: &str = "Quote not found in the document, showing full text.";

/// One run of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// The text of this run.
    pub text: String,
    /// Whether the run is part of the quote.
    pub is_match: bool,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_match: false,
        }
    }

    fn highlighted(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_match: true,
        }
    }
}

/// Source text split into highlighted and plain runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    /// Whether the quote was found at least once.
    pub matched: bool,
    /// Runs in source order; concatenated they reproduce the source.
    pub segments: Vec<Segment>,
}

impl Highlight {
    fn unmatched(source: &str) -> Self {
        Self {
            matched: false,
            segments: vec![Segment::plain(source)],
        }
    }

    /// Number of highlighted runs.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_match).count()
    }

    /// Notice to render instead of failing silently, if the quote was not found.
    #[must_use]
    pub const fn notice(&self) -> Option<&'static str> {
        if self.matched {
            None
        } else {
            Some(QUOTE_NOT_FOUND_NOTICE)
        }
    }
}

/// Compiles the loose pattern for a quote; `None` when the quote is blank.
fn loose_pattern(quote: &str) -> Option<Regex> {
    let words: Vec<String> = quote.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }

    match RegexBuilder::new(&words.join(FLEXIBLE_GAP))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            // Only reachable for quotes that blow the compiled size limit.
            tracing::warn!(error = %e, quote_len = quote.len(), "quote pattern rejected");
            None
        }
    }
}

/// Splits `source` into highlighted and plain runs for every occurrence of `quote`.
///
/// Every disjoint occurrence is highlighted. Callers that only want the first
/// one should use [`locate`].
#[must_use]
pub fn highlight(source: &str, quote: &str) -> Highlight {
    let Some(pattern) = loose_pattern(quote.trim()) else {
        return Highlight::unmatched(source);
    };

    let mut segments = Vec::new();
    let mut cursor = 0;
    for found in pattern.find_iter(source) {
        if found.start() > cursor {
            segments.push(Segment::plain(&source[cursor..found.start()]));
        }
        segments.push(Segment::highlighted(found.as_str()));
        cursor = found.end();
    }

    if segments.is_empty() {
        return Highlight::unmatched(source);
    }

    if cursor < source.len() {
        segments.push(Segment::plain(&source[cursor..]));
    }

    Highlight {
        matched: true,
        segments,
    }
}

/// Byte range of the first loose occurrence of `quote` in `source`.
#[must_use]
pub fn locate(source: &str, quote: &str) -> Option<Range<usize>> {
    loose_pattern(quote.trim())?.find(source).map(|m| m.range())
}
