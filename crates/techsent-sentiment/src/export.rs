//! Rendering analysis rows as Markdown, JSON or CSV.

use std::io::Write;

use serde::Serialize;

use crate::types::{AnalysisRow, RunSummary, SentimentResult};

/// Longest context shown in a Markdown cell, in characters.
const MARKDOWN_CONTEXT_CHARS: usize = 160;

/// Qualitative fields from the LLM reply, in display order.
const LLM_DETAILS: [&str; 4] = ["tone", "emotion", "intent", "stance"];

/// CSV header; must match the field order of [`ExportRow`].
const COLUMNS: [&str; 17] = [
    "term",
    "matched",
    "start_offset",
    "end_offset",
    "context",
    "finbert_label",
    "finbert_score",
    "finbert_positive",
    "finbert_negative",
    "finbert_neutral",
    "llm_label",
    "llm_score",
    "llm_tone",
    "llm_emotion",
    "llm_intent",
    "llm_stance",
    "agreement",
];

/// Flat record shared by the CSV and JSON writers.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    term: &'a str,
    matched: &'a str,
    start_offset: usize,
    end_offset: usize,
    context: &'a str,
    finbert_label: String,
    finbert_score: f32,
    finbert_positive: Option<&'a str>,
    finbert_negative: Option<&'a str>,
    finbert_neutral: Option<&'a str>,
    llm_label: String,
    llm_score: f32,
    llm_tone: Option<&'a str>,
    llm_emotion: Option<&'a str>,
    llm_intent: Option<&'a str>,
    llm_stance: Option<&'a str>,
    agreement: bool,
}

fn detail<'a>(result: &'a SentimentResult, key: &str) -> Option<&'a str> {
    result.details.get(key).map(String::as_str)
}

impl<'a> From<&'a AnalysisRow> for ExportRow<'a> {
    fn from(row: &'a AnalysisRow) -> Self {
        let fin = &row.financial_sentiment;
        let llm = &row.llm_sentiment;
        Self {
            term: &row.mention.term,
            matched: &row.mention.matched,
            start_offset: row.mention.start_offset,
            end_offset: row.mention.end_offset,
            context: &row.mention.context,
            finbert_label: fin.label.to_string(),
            finbert_score: fin.score,
            finbert_positive: detail(fin, "positive"),
            finbert_negative: detail(fin, "negative"),
            finbert_neutral: detail(fin, "neutral"),
            llm_label: llm.label.to_string(),
            llm_score: llm.score,
            llm_tone: detail(llm, "tone"),
            llm_emotion: detail(llm, "emotion"),
            llm_intent: detail(llm, "intent"),
            llm_stance: detail(llm, "stance"),
            agreement: row.agreement(),
        }
    }
}

/// Render a Markdown report: a short header block followed by one table row
/// per mention.
#[must_use]
pub fn render_markdown(rows: &[AnalysisRow], summary: &RunSummary, document: &str) -> String {
    let mut out = String::new();
    out.push_str("# Technology Sentiment Report\n\n");
    out.push_str(&format!("**Document**: {document}\n"));
    out.push_str(&format!("**Mentions**: {}\n", summary.mentions));
    out.push_str(&format!(
        "**Unavailable**: FinBERT {}, LLM {}\n",
        summary.financial_unavailable, summary.llm_unavailable
    ));
    out.push_str(&format!("**Disagreements**: {}\n", summary.disagreements));
    if summary.cancelled {
        out.push_str("**Status**: cancelled before all calls finished\n");
    }
    out.push_str("\n---\n\n");

    if rows.is_empty() {
        out.push_str("No mentions found.\n");
        return out;
    }

    out.push_str("| Term | Offset | FinBERT | LLM | LLM analysis | Agree | Context |\n");
    out.push_str("|------|--------|---------|-----|--------------|-------|---------|\n");
    for row in rows {
        out.push_str(&format!(
            "| {} | {}..{} | {} ({:.2}) | {} ({:.2}) | {} | {} | {} |\n",
            escape_cell(&row.mention.term),
            row.mention.start_offset,
            row.mention.end_offset,
            row.financial_sentiment.label,
            row.financial_sentiment.score,
            row.llm_sentiment.label,
            row.llm_sentiment.score,
            escape_cell(&llm_analysis(&row.llm_sentiment)),
            if row.agreement() { "yes" } else { "no" },
            escape_cell(&truncate_chars(&row.mention.context, MARKDOWN_CONTEXT_CHARS)),
        ));
    }
    out
}

/// Render rows as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if serialization fails.
pub fn render_json(rows: &[AnalysisRow]) -> Result<String, serde_json::Error> {
    let records: Vec<ExportRow<'_>> = rows.iter().map(ExportRow::from).collect();
    serde_json::to_string_pretty(&records)
}

/// Write rows as CSV with a header line.
///
/// # Errors
///
/// Returns [`csv::Error`] if a record cannot be written or flushed.
pub fn write_csv<W: Write>(rows: &[AnalysisRow], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        wtr.write_record(COLUMNS)?;
    }
    for row in rows {
        wtr.serialize(ExportRow::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// One-line run summary printed after the report.
#[must_use]
pub fn summary_line(summary: &RunSummary) -> String {
    format!(
        "{} mentions, {} failed provider calls (finbert {}, llm {}), {} disagreements{}",
        summary.mentions,
        summary.failed_calls(),
        summary.financial_unavailable,
        summary.llm_unavailable,
        summary.disagreements,
        if summary.cancelled { ", cancelled" } else { "" }
    )
}

/// `tone: Cautious; intent: risk disclosure`, skipping absent fields.
fn llm_analysis(result: &SentimentResult) -> String {
    LLM_DETAILS
        .iter()
        .filter_map(|&key| detail(result, key).map(|v| format!("{key}: {v}")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace(['\r', '\n'], " ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}
