//! Tabular data model shared by every pipeline stage.
//!
//! Cells are classified once, when text leaves the PDF reader, so later
//! stages only ever match on the three [`Cell`] variants instead of
//! re-inspecting strings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sentinel column name used when a header cell is missing.
pub const MISSING_HEADER: &str = "Unknown Column";

/// One cell value, resolved at ingestion time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    /// Free text.
    Text(String),
    /// Text that reads as a number (`1`, `-2.5`, `1,234`).
    Numeric(String),
    /// Absent, empty or whitespace-only.
    Missing,
}

impl Cell {
    /// Classify a raw string extracted from a document.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Missing
        } else if is_numeric(trimmed) {
            Cell::Numeric(trimmed.to_string())
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    /// The cell text, or `None` when missing.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) | Cell::Numeric(s) => Some(s),
            Cell::Missing => None,
        }
    }

    /// The cell text, with missing cells rendered as the empty string.
    pub fn text(&self) -> &str {
        self.as_str().unwrap_or("")
    }

    /// Missing, or text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.as_str().is_none_or(|s| s.trim().is_empty())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Numeric(_))
    }
}

impl From<&str> for Cell {
    fn from(raw: &str) -> Self {
        Cell::parse(raw)
    }
}

impl From<Option<&str>> for Cell {
    fn from(raw: Option<&str>) -> Self {
        raw.map_or(Cell::Missing, Cell::parse)
    }
}

/// Optional sign, digits (commas only between groups of three), optional
/// fraction.
static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?|\.\d+)$").unwrap());

/// True when `value` is a plain decimal number such as `12`, `-0.5` or
/// `1,234.5`. Words `f64` would accept (`NaN`, `inf`) and exponents are not
/// numbers here.
pub fn is_numeric(value: &str) -> bool {
    RE_NUMBER.is_match(value.trim())
}

/// A row is blank when every cell is missing or empty.
pub fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

/// A tabular region detected on one page, before any header resolution.
///
/// Rows may be ragged. Construction through [`RawTable::new`] guarantees at
/// least one non-blank row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// 1-based page number.
    pub page: u32,
    /// 0-based detection order within the page.
    pub region: usize,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Build a table from a detected region.
    ///
    /// Returns `None` when the region has fewer than two rows, or when no
    /// rows survive once fully blank rows are dropped.
    pub fn new(page: u32, region: usize, rows: Vec<Vec<Cell>>) -> Option<Self> {
        if rows.len() < 2 {
            return None;
        }
        let rows: Vec<Vec<Cell>> = rows.into_iter().filter(|r| !is_blank_row(r)).collect();
        if rows.is_empty() {
            return None;
        }
        Some(Self { page, region, rows })
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// The first row; the region's header candidate.
    pub fn first_row(&self) -> &[Cell] {
        &self.rows[0]
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A table reshaped to its document header.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedTable {
    pub page: u32,
    pub region: usize,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl NormalizedTable {
    /// Build a table, padding or truncating every row to the column count.
    pub fn new(page: u32, region: usize, columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Missing);
                row
            })
            .collect();
        Self {
            page,
            region,
            columns,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Replace the column names positionally.
    ///
    /// Returns `false` and leaves the table untouched when the widths differ.
    pub fn rename_columns(&mut self, columns: &[String]) -> bool {
        if columns.len() != self.columns.len() {
            return false;
        }
        self.columns = columns.to_vec();
        true
    }
}

/// How a document's header was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderSource {
    /// The most frequent valid first row.
    Inferred,
    /// The configured standard header.
    Standard,
    /// Synthesised `Column_N` names.
    Placeholder,
}

/// The normalised tables of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentResult {
    /// Submission index within the batch.
    pub index: usize,
    pub url: String,
    /// Column names used for every table of this document.
    pub header: Vec<String>,
    pub header_source: HeaderSource,
    pub tables: Vec<NormalizedTable>,
}

impl DocumentResult {
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(NormalizedTable::row_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// The final concatenation of all documents' tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl MergedTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| row.get(index).unwrap_or(&Cell::Missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|c| Cell::parse(c)).collect()
    }

    #[test]
    fn classifies_cells() {
        assert_eq!(Cell::parse("  Name "), Cell::Text("Name".into()));
        assert_eq!(Cell::parse("1,234.5"), Cell::Numeric("1,234.5".into()));
        assert_eq!(Cell::parse("-3"), Cell::Numeric("-3".into()));
        assert_eq!(Cell::parse("   "), Cell::Missing);
        assert_eq!(Cell::from(None), Cell::Missing);
    }

    #[test]
    fn only_plain_decimals_are_numeric() {
        for number in ["0", "1234", "+0.5", ".5", "1,234", "12,345,678.90", "-1,000"] {
            assert!(is_numeric(number), "{number}");
        }
        for word in ["NaN", "nan", "inf", "-inf", "Infinity", "1e5", "1,2", "12,34", "1,2345", ",123", "1.", "1.2.3"] {
            assert!(!is_numeric(word), "{word}");
        }
        assert_eq!(Cell::parse("Infinity"), Cell::Text("Infinity".into()));
        assert_eq!(Cell::parse("1,2"), Cell::Text("1,2".into()));
    }

    #[test]
    fn empty_text_counts_as_blank() {
        assert!(Cell::Text(String::new()).is_blank());
        assert!(Cell::Missing.is_blank());
        assert!(!Cell::Numeric("0".into()).is_blank());
    }

    #[test]
    fn single_row_region_is_discarded() {
        assert!(RawTable::new(1, 0, vec![row(&["a", "b"])]).is_none());
    }

    #[test]
    fn blank_rows_are_dropped() {
        let table = RawTable::new(
            1,
            0,
            vec![row(&["Name", "Amount"]), row(&["", " "]), row(&["x", "1"])],
        )
        .unwrap();
        assert_eq!(table.rows().len(), 2);
    }

    #[test]
    fn all_blank_region_is_discarded() {
        let rows = vec![row(&["", ""]), vec![Cell::Missing, Cell::Missing]];
        assert!(RawTable::new(1, 0, rows).is_none());
    }

    #[test]
    fn normalized_rows_match_header_width() {
        let table = NormalizedTable::new(
            1,
            0,
            vec!["A".into(), "B".into()],
            vec![row(&["1"]), row(&["1", "2", "3"])],
        );
        assert!(table.rows().iter().all(|r| r.len() == 2));
        assert_eq!(table.rows()[0][1], Cell::Missing);
    }

    #[test]
    fn rename_requires_same_width() {
        let mut table = NormalizedTable::new(1, 0, vec!["A".into()], vec![row(&["1"])]);
        assert!(!table.rename_columns(&["X".into(), "Y".into()]));
        assert!(table.rename_columns(&["X".into()]));
        assert_eq!(table.columns(), ["X".to_string()]);
    }
}
