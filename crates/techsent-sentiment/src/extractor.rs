//! Mention extraction and context windowing.
//!
//! Every variant of every term is compiled into a case-insensitive,
//! word-bounded pattern and matched against the whole document. Each hit
//! becomes a [`Mention`] carrying the text `window_size` characters either
//! side of the match, clamped silently at the document edges.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use techsent_core::{Term, Vocabulary};

use crate::error::ExtractError;
use crate::types::Mention;

/// Extraction knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Characters (Unicode scalar values) of context on each side of a match.
    pub window_size: usize,
    /// Keep only the earliest `n` mentions of each term.
    pub max_mentions_per_term: Option<usize>,
}

impl ExtractOptions {
    #[must_use]
    pub fn with_window(window_size: usize) -> Self {
        Self {
            window_size,
            max_mentions_per_term: None,
        }
    }
}

/// Find every mention of every term, with no per-term cap.
///
/// # Errors
///
/// See [`extract_with`].
pub fn extract(
    document: &str,
    vocabulary: &Vocabulary,
    window_size: usize,
) -> Result<Vec<Mention>, ExtractError> {
    extract_with(document, vocabulary, &ExtractOptions::with_window(window_size))
}

/// Find mentions of each vocabulary term in `document`.
///
/// Mentions come back ordered by `start_offset`, ties broken by vocabulary
/// order. Overlapping matches of different terms are all kept. When several
/// variants of one term match at the same offset, the longest match wins.
///
/// # Errors
///
/// - [`ExtractError::InvalidVocabulary`] if `vocabulary` has no terms.
/// - [`ExtractError::EmptyDocument`] if `document` is empty or whitespace-only.
/// - [`ExtractError::Pattern`] if a variant cannot be compiled.
pub fn extract_with(
    document: &str,
    vocabulary: &Vocabulary,
    options: &ExtractOptions,
) -> Result<Vec<Mention>, ExtractError> {
    if vocabulary.is_empty() {
        return Err(ExtractError::InvalidVocabulary);
    }
    if document.trim().is_empty() {
        return Err(ExtractError::EmptyDocument);
    }

    let mut ranked: Vec<(usize, Mention)> = Vec::new();

    for (rank, term) in vocabulary.terms().iter().enumerate() {
        let spans = term_spans(document, term)?;
        let limit = options.max_mentions_per_term.unwrap_or(usize::MAX);

        for (start, end) in spans.into_iter().take(limit) {
            ranked.push((rank, build_mention(document, term, start, end, options.window_size)));
        }
    }

    ranked.sort_by_key(|(rank, m)| (m.start_offset, *rank));

    tracing::debug!(
        terms = vocabulary.len(),
        mentions = ranked.len(),
        window = options.window_size,
        "mention extraction complete"
    );

    Ok(ranked.into_iter().map(|(_, m)| m).collect())
}

/// Match spans of all of a term's variants, keyed by start offset.
fn term_spans(document: &str, term: &Term) -> Result<BTreeMap<usize, usize>, ExtractError> {
    let mut spans: BTreeMap<usize, usize> = BTreeMap::new();

    for variant in &term.variants {
        let Some(pattern) = variant_pattern(variant)
            .map_err(|source| ExtractError::Pattern {
                term: term.name.clone(),
                source,
            })?
        else {
            continue;
        };

        for m in pattern.find_iter(document) {
            spans
                .entry(m.start())
                .and_modify(|end| *end = (*end).max(m.end()))
                .or_insert(m.end());
        }
    }

    Ok(spans)
}

/// Compile a variant into a case-insensitive whole-word pattern.
///
/// Internal whitespace matches any whitespace run, so phrases survive line
/// wraps. `\b` is only asserted on edges that are word characters; an edge
/// like the `.` in `.NET` delimits itself. Returns `None` for blank variants.
fn variant_pattern(variant: &str) -> Result<Option<Regex>, regex::Error> {
    let words: Vec<&str> = variant.split_whitespace().collect();
    let (Some(first), Some(last)) = (words.first(), words.last()) else {
        return Ok(None);
    };

    let body = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join(r"\s+");

    let leading = if first.chars().next().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    let trailing = if last.chars().next_back().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };

    RegexBuilder::new(&format!("{leading}{body}{trailing}"))
        .case_insensitive(true)
        .build()
        .map(Some)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn build_mention(document: &str, term: &Term, start: usize, end: usize, window: usize) -> Mention {
    let context_start = window_start(document, start, window);
    let context_end = window_end(document, end, window);
    Mention {
        term: term.name.clone(),
        matched: document[start..end].to_string(),
        start_offset: start,
        end_offset: end,
        context_start,
        context_end,
        context: document[context_start..context_end].to_string(),
    }
}

/// Byte offset `window` characters before `start`, clamped to 0.
fn window_start(document: &str, start: usize, window: usize) -> usize {
    if window == 0 {
        return start;
    }
    document[..start]
        .char_indices()
        .rev()
        .nth(window - 1)
        .map_or(0, |(i, _)| i)
}

/// Byte offset `window` characters after `end`, clamped to the document length.
fn window_end(document: &str, end: usize, window: usize) -> usize {
    document[end..]
        .char_indices()
        .nth(window)
        .map_or(document.len(), |(i, _)| end + i)
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
