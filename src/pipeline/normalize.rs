//! Document normalisation: apply a document's resolved header to each of
//! its raw tables.

use crate::pipeline::header::clean_header_row;
use crate::table::{Cell, DocumentResult, HeaderSource, NormalizedTable, RawTable};
use std::collections::{HashMap, HashSet};

/// Make column names unique by suffixing repeats: `Amount`, `Amount_1`,
/// `Amount_2`, …
pub fn dedup_columns(names: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut next_suffix: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        if taken.insert(name.clone()) {
            out.push(name.clone());
            continue;
        }
        let suffix = next_suffix.entry(name.as_str()).or_insert(1);
        loop {
            let candidate = format!("{name}_{suffix}");
            *suffix += 1;
            if taken.insert(candidate.clone()) {
                out.push(candidate);
                break;
            }
        }
    }
    out
}

/// Reshape one table to `header`. Returns `None` when no data rows remain.
///
/// Rows are padded with missing cells or truncated to the header width, and
/// any row that repeats the header is removed.
pub fn normalize_table(table: &RawTable, header: &[String], columns: &[String]) -> Option<NormalizedTable> {
    let width = header.len();
    let rows: Vec<_> = table
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(width, Cell::Missing);
            row
        })
        .filter(|row| clean_header_row(row) != header)
        .collect();

    if rows.is_empty() {
        return None;
    }
    Some(NormalizedTable::new(
        table.page,
        table.region,
        columns.to_vec(),
        rows,
    ))
}

/// Normalise every table of a document to its header.
pub fn normalize_document(
    index: usize,
    url: &str,
    tables: &[RawTable],
    header: Vec<String>,
    header_source: HeaderSource,
) -> DocumentResult {
    let columns = dedup_columns(&header);
    let tables = tables
        .iter()
        .filter_map(|table| normalize_table(table, &header, &columns))
        .collect();

    DocumentResult {
        index,
        url: url.to_string(),
        header: columns,
        header_source,
        tables,
    }
}
