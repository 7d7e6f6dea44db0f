//! Header inference: choose the one header row that best describes a
//! document's columns.
//!
//! Every detected table offers its first row as a candidate. Candidates are
//! cleaned, tallied across the document and ranked by frequency; the most
//! frequent candidate that actually looks like a header wins. Frequency
//! alone is not trusted: a numeric data row that repeats on every page must
//! not beat a genuine header seen once.

use crate::table::{Cell, HeaderSource, RawTable, MISSING_HEADER};
use once_cell::sync::Lazy;
use regex::Regex;

/// Knobs for header inference, derived from
/// [`crate::config::ExtractionConfig::header_rules`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRules {
    /// Minimum share of non-numeric text cells in a header row.
    pub min_text_ratio: f32,
    /// Fallback header when no candidate qualifies.
    pub standard_header: Option<Vec<String>>,
}

impl Default for HeaderRules {
    fn default() -> Self {
        Self {
            min_text_ratio: 0.5,
            standard_header: None,
        }
    }
}

// ── Cleaning ─────────────────────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse whitespace runs (including newlines) to one space and trim.
/// Idempotent.
pub fn clean_header_text(raw: &str) -> String {
    RE_WHITESPACE.replace_all(raw, " ").trim().to_string()
}

/// Clean one header cell; missing cells become [`MISSING_HEADER`].
pub fn clean_header_cell(cell: &Cell) -> String {
    match cell.as_str() {
        Some(text) => clean_header_text(text),
        None => MISSING_HEADER.to_string(),
    }
}

pub fn clean_header_row(row: &[Cell]) -> Vec<String> {
    row.iter().map(clean_header_cell).collect()
}

// ── Validity ─────────────────────────────────────────────────────────────

/// Whether `row` can serve as a header.
///
/// Rejects rows with any empty, missing or numeric cell, and rows where
/// fewer than `min_text_ratio` of the cells are text.
pub fn is_valid_header(row: &[Cell], min_text_ratio: f32) -> bool {
    if row.is_empty() {
        return false;
    }
    if row.iter().any(|cell| cell.is_blank() || cell.is_numeric()) {
        return false;
    }
    let text_cells = row
        .iter()
        .filter(|cell| matches!(cell, Cell::Text(_)))
        .count();
    text_cells as f32 / row.len() as f32 >= min_text_ratio
}

// ── Tally ────────────────────────────────────────────────────────────────

/// A cleaned first row and how often it occurred in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCandidate {
    pub names: Vec<String>,
    pub count: usize,
    /// The raw row as first seen; validity is judged on it.
    pub first_seen: Vec<Cell>,
}

/// Tally the cleaned first rows of `tables`, in first-seen order.
pub fn tally_candidates(tables: &[RawTable]) -> Vec<HeaderCandidate> {
    let mut tally: Vec<HeaderCandidate> = Vec::new();
    for table in tables {
        let names = clean_header_row(table.first_row());
        match tally.iter_mut().find(|c| c.names == names) {
            Some(candidate) => candidate.count += 1,
            None => tally.push(HeaderCandidate {
                names,
                count: 1,
                first_seen: table.first_row().to_vec(),
            }),
        }
    }
    tally
}

/// Order candidates by descending count; ties keep first-seen order.
pub fn rank_candidates(mut candidates: Vec<HeaderCandidate>) -> Vec<HeaderCandidate> {
    candidates.sort_by(|a, b| b.count.cmp(&a.count));
    candidates
}

/// `Column_0 … Column_{n-1}`.
pub fn placeholder_header(width: usize) -> Vec<String> {
    (0..width).map(|i| format!("Column_{i}")).collect()
}

/// Resolve the header for one document's tables.
///
/// Returns `None` when the document has no tables.
pub fn infer_header(tables: &[RawTable], rules: &HeaderRules) -> Option<(Vec<String>, HeaderSource)> {
    let first = tables.first()?;

    let ranked = rank_candidates(tally_candidates(tables));
    if let Some(winner) = ranked
        .into_iter()
        .find(|c| is_valid_header(&c.first_seen, rules.min_text_ratio))
    {
        return Some((winner.names, HeaderSource::Inferred));
    }

    if let Some(standard) = &rules.standard_header {
        return Some((standard.clone(), HeaderSource::Standard));
    }

    Some((
        placeholder_header(first.column_count()),
        HeaderSource::Placeholder,
    ))
}
