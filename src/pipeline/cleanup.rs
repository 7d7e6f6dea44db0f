//! Merge and cleanup: concatenate the unified documents into one table and
//! remove rows that carry no data.
//!
//! Two kinds of rows are removed after concatenation:
//!
//! 1. Blank rows, where every cell is missing or empty.
//! 2. Stray header rows: table headers repeated mid-page that survived
//!    normalisation because their text differs slightly from the resolved
//!    header (`"Amount (EUR)"` under `Amount`). A row is treated as a header
//!    when every cell starts with the first two letters of its column name.
//!    Rows are judged against their own document's columns while merging,
//!    so columns a document lacks never hide its stray headers.

use crate::config::WidthMismatchPolicy;
use crate::pipeline::header::clean_header_text;
use crate::table::{is_blank_row, Cell, DocumentResult, MergedTable};
use serde::Serialize;
use tracing::debug;

/// Rows removed by [`cleanup`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub blank_rows: usize,
    pub header_rows: usize,
}

impl std::ops::AddAssign for CleanupStats {
    fn add_assign(&mut self, other: Self) {
        self.blank_rows += other.blank_rows;
        self.header_rows += other.header_rows;
    }
}

/// Columns of the merged table: the global header, followed (under
/// [`WidthMismatchPolicy::Union`]) by any column name only found in
/// mismatched documents, in first-seen order.
pub fn merged_columns(
    documents: &[DocumentResult],
    global_header: &[String],
    policy: WidthMismatchPolicy,
) -> Vec<String> {
    let mut columns = global_header.to_vec();
    if policy == WidthMismatchPolicy::Union {
        for doc in documents {
            if doc.header.len() == global_header.len() {
                continue;
            }
            for name in &doc.header {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
    }
    columns
}

/// Append every row of `doc` to `merged`, placing each cell under the
/// merged column of the same name. Columns the document lacks stay missing.
///
/// Rows that repeat the document's own column names are skipped; returns
/// how many.
pub fn append_document(merged: &mut MergedTable, doc: &DocumentResult) -> usize {
    let width = merged.columns.len();
    let targets: Vec<Option<usize>> = doc
        .header
        .iter()
        .map(|name| merged.columns.iter().position(|c| c == name))
        .collect();

    let mut header_rows = 0;
    for table in &doc.tables {
        for row in table.rows() {
            if looks_like_header(row, &doc.header) {
                header_rows += 1;
                continue;
            }
            let mut out = vec![Cell::Missing; width];
            for (cell, target) in row.iter().zip(&targets) {
                if let Some(i) = target {
                    out[*i] = cell.clone();
                }
            }
            merged.rows.push(out);
        }
    }
    header_rows
}

/// Concatenate documents in (document, table, row) order.
///
/// Documents are expected in submission order. Under
/// [`WidthMismatchPolicy::Exclude`], documents whose header width differs
/// from `global_header` are left out. The returned stats count the stray
/// header rows skipped along the way.
pub fn merge_documents(
    documents: &[DocumentResult],
    global_header: &[String],
    policy: WidthMismatchPolicy,
) -> (MergedTable, CleanupStats) {
    let mut merged = MergedTable::new(merged_columns(documents, global_header, policy));
    let mut stats = CleanupStats::default();
    for doc in documents {
        if policy == WidthMismatchPolicy::Exclude && doc.header.len() != global_header.len() {
            debug!("Excluding document #{} from merge (width mismatch)", doc.index);
            continue;
        }
        stats.header_rows += append_document(&mut merged, doc);
    }
    (merged, stats)
}

/// Remove rows whose cells are all missing or empty. Returns the number
/// removed.
pub fn drop_blank_rows(table: &mut MergedTable) -> usize {
    let before = table.rows.len();
    table.rows.retain(|row| !is_blank_row(row));
    before - table.rows.len()
}

/// Whether `row` reads like a copy of the column names.
pub fn looks_like_header(row: &[Cell], columns: &[String]) -> bool {
    if row.is_empty() {
        return false;
    }
    row.iter().zip(columns).all(|(cell, column)| {
        let Some(text) = cell.as_str() else {
            return false;
        };
        let text = clean_header_text(text).to_lowercase();
        if text.is_empty() {
            return false;
        }
        let prefix: String = column.to_lowercase().chars().take(2).collect();
        text.starts_with(&prefix)
    })
}

/// Remove rows that repeat the column names. Returns the number removed.
pub fn drop_repeated_headers(table: &mut MergedTable) -> usize {
    let before = table.rows.len();
    let columns = table.columns.clone();
    table.rows.retain(|row| !looks_like_header(row, &columns));
    before - table.rows.len()
}

/// Run both cleanup passes.
pub fn cleanup(table: &mut MergedTable) -> CleanupStats {
    let blank_rows = drop_blank_rows(table);
    let header_rows = drop_repeated_headers(table);
    CleanupStats {
        blank_rows,
        header_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{HeaderSource, NormalizedTable};

    fn strings(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn doc(index: usize, header: &[&str], rows: &[&[&str]]) -> DocumentResult {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|c| Cell::parse(c)).collect())
            .collect();
        DocumentResult {
            index,
            url: format!("https://example.com/{index}.pdf"),
            header: strings(header),
            header_source: HeaderSource::Inferred,
            tables: vec![NormalizedTable::new(1, 0, strings(header), rows)],
        }
    }

    #[test]
    fn merge_keeps_submission_order() {
        let docs = vec![
            doc(0, &["Name", "Amount"], &[&["a", "1"], &["b", "2"]]),
            doc(1, &["Name", "Amount"], &[&["c", "3"]]),
        ];
        let (merged, _) = merge_documents(&docs, &strings(&["Name", "Amount"]), WidthMismatchPolicy::Union);
        assert_eq!(merged.row_count(), 3);
        let names: Vec<&str> = merged.column(0).map(Cell::text).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn union_aligns_mismatched_documents_by_name() {
        let docs = vec![
            doc(0, &["Name", "Amount"], &[&["a", "1"]]),
            doc(1, &["Amount", "Name", "Notes"], &[&["2", "b", "late"]]),
        ];
        let (merged, _) = merge_documents(&docs, &strings(&["Name", "Amount"]), WidthMismatchPolicy::Union);
        assert_eq!(merged.columns, strings(&["Name", "Amount", "Notes"]));
        assert_eq!(merged.rows[0][2], Cell::Missing);
        assert_eq!(merged.rows[1][0], Cell::Text("b".into()));
        assert_eq!(merged.rows[1][1], Cell::Numeric("2".into()));
        assert_eq!(merged.rows[1][2], Cell::Text("late".into()));
    }

    #[test]
    fn exclude_drops_mismatched_documents() {
        let docs = vec![
            doc(0, &["Name", "Amount"], &[&["a", "1"]]),
            doc(1, &["A", "B", "C"], &[&["x", "y", "z"]]),
        ];
        let (merged, _) = merge_documents(&docs, &strings(&["Name", "Amount"]), WidthMismatchPolicy::Exclude);
        assert_eq!(merged.columns.len(), 2);
        assert_eq!(merged.row_count(), 1);
    }

    #[test]
    fn cleanup_drops_blank_and_header_like_rows() {
        let mut table = MergedTable {
            columns: strings(&["Name", "Amount"]),
            rows: vec![
                vec![Cell::Text("Alice".into()), Cell::Numeric("10".into())],
                vec![Cell::Text(String::new()), Cell::Missing],
                vec![Cell::Text("NAME".into()), Cell::Text("Amount (EUR)".into())],
                vec![Cell::Text("Nadia".into()), Cell::Numeric("7".into())],
            ],
        };
        let stats = cleanup(&mut table);
        assert_eq!(stats.blank_rows, 1);
        assert_eq!(stats.header_rows, 1);
        assert_eq!(table.row_count(), 2);
        // "Nadia" shares the "na" prefix but "7" does not start with "am".
        assert_eq!(table.rows[1][0], Cell::Text("Nadia".into()));
    }

    #[test]
    fn union_drops_stray_headers_of_narrower_documents() {
        let docs = vec![
            doc(0, &["Name", "Amount", "Notes"], &[&["a", "1", "x"]]),
            doc(1, &["Name", "Amount"], &[&["b", "2"], &["NAME", "Amount (EUR)"], &["c", "3"]]),
        ];
        let global = strings(&["Name", "Amount", "Notes"]);
        let (mut merged, mut stats) = merge_documents(&docs, &global, WidthMismatchPolicy::Union);
        stats += cleanup(&mut merged);

        assert_eq!(stats.header_rows, 1);
        let names: Vec<&str> = merged.column(0).map(Cell::text).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(merged.rows[1][2], Cell::Missing);
    }

    #[test]
    fn missing_cell_never_looks_like_header() {
        let columns = strings(&["Name", "Amount"]);
        assert!(!looks_like_header(&[Cell::Text("Name".into()), Cell::Missing], &columns));
        assert!(looks_like_header(
            &[Cell::Text("name".into()), Cell::Text("am".into())],
            &columns
        ));
    }
}
