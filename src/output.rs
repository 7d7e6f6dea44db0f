//! Result types returned by the extraction entry points.
//!
//! [`ExtractionOutput`] pairs the encoded artifact with a [`BatchReport`]
//! describing what happened to every document. The report is plain data
//! (`Serialize`) so hosts can log it or return it as JSON.

use crate::error::{DocumentError, FailureKind};
use crate::table::DocumentResult;
use serde::{Deserialize, Serialize};

/// The encoded output of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub bytes: Vec<u8>,
    /// e.g. `text/csv`.
    pub media_type: String,
    /// Suggested download name, e.g. `final_extracted_data.csv`.
    pub filename: String,
}

impl OutputArtifact {
    /// Value for an HTTP `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What happened to one document.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    /// 0-based submission index.
    pub index: usize,
    pub url: String,
    pub result: Result<DocumentResult, DocumentError>,
    /// Fetch + parse wall-clock time.
    pub duration_ms: u64,
}

impl DocumentOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Data rows contributed, 0 on failure.
    pub fn row_count(&self) -> usize {
        self.result.as_ref().map_or(0, DocumentResult::row_count)
    }
}

/// A failed document, as listed in the [`BatchReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub index: usize,
    pub url: String,
    pub kind: FailureKind,
    pub error: DocumentError,
}

impl DocumentFailure {
    pub fn new(index: usize, error: DocumentError) -> Self {
        Self {
            index,
            url: error.url().to_string(),
            kind: error.kind(),
            error,
        }
    }
}

/// Summary of a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// URLs submitted.
    pub requested: usize,
    /// Documents that were fetched and parsed (with or without tables).
    pub succeeded: usize,
    /// Successful documents that held no usable table.
    pub empty: usize,
    /// Documents that failed to fetch or parse.
    pub failed: usize,
    /// Normalised tables merged.
    pub tables: usize,
    /// Rows in the final table.
    pub rows: usize,
    pub dropped_blank_rows: usize,
    pub dropped_header_rows: usize,
    /// Batch-wide header chosen by schema unification.
    pub global_header: Vec<String>,
    /// Submission indices renamed onto the global header.
    pub remapped_documents: Vec<usize>,
    /// Submission indices whose header width differs from the global one.
    pub mismatched_documents: Vec<usize>,
    pub failures: Vec<DocumentFailure>,
    pub duration_ms: u64,
}

impl BatchReport {
    /// Fraction of requested documents that failed.
    pub fn failure_rate(&self) -> f64 {
        if self.requested == 0 {
            0.0
        } else {
            self.failed as f64 / self.requested as f64
        }
    }
}

/// Result of [`crate::extract`].
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub artifact: OutputArtifact,
    pub report: BatchReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_disposition_quotes_filename() {
        let artifact = OutputArtifact {
            bytes: b"a\n".to_vec(),
            media_type: "text/csv".into(),
            filename: "final_extracted_data.csv".into(),
        };
        assert_eq!(
            artifact.content_disposition(),
            "attachment; filename=\"final_extracted_data.csv\""
        );
        assert_eq!(artifact.len(), 2);
    }

    #[test]
    fn failure_carries_url_and_kind() {
        let failure = DocumentFailure::new(
            4,
            DocumentError::FetchTimeout {
                url: "https://example.com/slow.pdf".into(),
                secs: 10,
            },
        );
        assert_eq!(failure.url, "https://example.com/slow.pdf");
        assert_eq!(failure.kind, FailureKind::Fetch);
    }

    #[test]
    fn report_serialises_to_json() {
        let report = BatchReport {
            requested: 4,
            failed: 1,
            global_header: vec!["Name".into()],
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["requested"], 4);
        assert_eq!(json["global_header"][0], "Name");
        assert_eq!(report.failure_rate(), 0.25);
    }
}
