//! Schema unification across documents.
//!
//! The header shared by the most documents becomes the batch-wide header.
//! Documents with a different header of the same width are assumed to hold
//! the same columns under other names and are renamed positionally.
//! Documents of another width cannot be mapped by position and are left
//! as they are; the merge stage applies the width-mismatch policy to them.

use crate::table::DocumentResult;
use tracing::debug;

/// A header and the number of documents using it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTally {
    pub header: Vec<String>,
    pub documents: usize,
}

/// Count documents per header, in first-seen order.
pub fn tally_headers(documents: &[DocumentResult]) -> Vec<HeaderTally> {
    let mut tally: Vec<HeaderTally> = Vec::new();
    for doc in documents {
        match tally.iter_mut().find(|t| t.header == doc.header) {
            Some(entry) => entry.documents += 1,
            None => tally.push(HeaderTally {
                header: doc.header.clone(),
                documents: 1,
            }),
        }
    }
    tally
}

/// The most common header. Ties go to the header seen first, so callers
/// must pass documents in submission order.
pub fn select_global_header(tally: &[HeaderTally]) -> Option<Vec<String>> {
    let mut best: Option<&HeaderTally> = None;
    for entry in tally {
        if best.is_none_or(|b| entry.documents > b.documents) {
            best = Some(entry);
        }
    }
    best.map(|b| b.header.clone())
}

/// Result of [`unify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedBatch {
    pub global_header: Vec<String>,
    pub documents: Vec<DocumentResult>,
    /// Submission indices of documents renamed onto the global header.
    pub remapped: Vec<usize>,
    /// Submission indices of documents whose header width differs.
    pub mismatched: Vec<usize>,
}

/// Reconcile headers across `documents` (submission order, no empty
/// documents). Returns `None` when there is nothing to unify.
pub fn unify(mut documents: Vec<DocumentResult>) -> Option<UnifiedBatch> {
    let global_header = select_global_header(&tally_headers(&documents))?;
    let mut remapped = Vec::new();
    let mut mismatched = Vec::new();

    for doc in &mut documents {
        if doc.header == global_header {
            continue;
        }
        if doc.header.len() != global_header.len() {
            debug!(
                "Document #{} has {} columns, batch header has {}",
                doc.index,
                doc.header.len(),
                global_header.len()
            );
            mismatched.push(doc.index);
            continue;
        }
        for table in &mut doc.tables {
            table.rename_columns(&global_header);
        }
        doc.header = global_header.clone();
        remapped.push(doc.index);
    }

    Some(UnifiedBatch {
        global_header,
        documents,
        remapped,
        mismatched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, HeaderSource, NormalizedTable};

    fn doc(index: usize, header: &[&str]) -> DocumentResult {
        let columns: Vec<String> = header.iter().map(|s| s.to_string()).collect();
        let row = vec![Cell::Numeric("1".into()); columns.len()];
        DocumentResult {
            index,
            url: format!("https://example.com/{index}.pdf"),
            header: columns.clone(),
            header_source: HeaderSource::Inferred,
            tables: vec![NormalizedTable::new(1, 0, columns, vec![row])],
        }
    }

    #[test]
    fn majority_header_wins() {
        let docs = vec![doc(0, &["a", "b"]), doc(1, &["x", "y"]), doc(2, &["x", "y"])];
        let tally = tally_headers(&docs);
        assert_eq!(select_global_header(&tally).unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn ties_go_to_first_document() {
        let docs = vec![doc(0, &["a", "b"]), doc(1, &["x", "y"])];
        assert_eq!(
            select_global_header(&tally_headers(&docs)).unwrap(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn remaps_only_same_width_documents() {
        let docs = vec![
            doc(0, &["A", "B", "C"]),
            doc(1, &["A", "B", "C"]),
            doc(2, &["X", "Y", "Z"]),
            doc(3, &["P", "Q", "R", "S"]),
        ];
        let batch = unify(docs).unwrap();
        assert_eq!(batch.global_header, vec!["A", "B", "C"]);
        assert_eq!(batch.remapped, vec![2]);
        assert_eq!(batch.mismatched, vec![3]);
        assert_eq!(batch.documents[2].tables[0].columns(), ["A", "B", "C"]);
        assert_eq!(batch.documents[3].header, vec!["P", "Q", "R", "S"]);
    }

    #[test]
    fn empty_batch_has_no_header() {
        assert!(unify(Vec::new()).is_none());
    }
}
