//! Error types for the edgequake-pdf2table library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the batch cannot produce an artifact
//!   (no URLs supplied, unknown output format, nothing extracted from any
//!   document). Returned as `Err(ExtractError)` from the top-level
//!   `extract*` functions.
//!
//! * [`DocumentError`] — **Non-fatal**: a single document failed (network
//!   error, timeout, corrupt PDF) but its siblings are fine. Stored inside
//!   [`crate::output::DocumentOutcome`] and summarised in
//!   [`crate::output::BatchReport`]; the document is simply left out of the
//!   merge.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2table library.
///
/// Document-level failures use [`DocumentError`] and never abort a batch.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Caller input errors ───────────────────────────────────────────────
    /// The batch contained no document URLs.
    #[error("No document URLs provided")]
    NoDocuments,

    /// The requested output codec is not known.
    #[error("Unsupported output format '{format}'\nSupported formats: csv, parquet.")]
    UnsupportedFormat { format: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Batch outcome errors ──────────────────────────────────────────────
    /// Every document either failed or yielded no usable table rows.
    #[error("No tables were extracted from {requested} document(s) ({failed} failed)")]
    NothingExtracted { requested: usize, failed: usize },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Serialising the merged table failed.
    #[error("Failed to encode {format} output: {detail}")]
    Encode { format: String, detail: String },

    /// The batch scratch directory could not be created.
    #[error("Failed to create scratch directory: {source}")]
    ScratchUnavailable {
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// True for the "nothing extracted" outcome, as opposed to a fault.
    ///
    /// Transport layers map this to a client-facing "no tables found"
    /// response rather than a server error.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, ExtractError::NothingExtracted { .. })
    }

    /// True when the error was caused by the caller's request rather than
    /// by the documents or the environment.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ExtractError::NoDocuments
                | ExtractError::UnsupportedFormat { .. }
                | ExtractError::InvalidConfig(_)
        )
    }
}

/// Broad category of a [`DocumentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The document could not be downloaded.
    Fetch,
    /// The document was downloaded but could not be read as a PDF.
    Parse,
}

/// A non-fatal error for a single document.
///
/// The orchestrator logs it with the document URL and excludes the
/// document from the merge; sibling documents are unaffected.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The URL could not be parsed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network-level download failure.
    #[error("Failed to download '{url}': {reason}")]
    FetchFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    FetchTimeout { url: String, secs: u64 },

    /// The server answered with a non-success status.
    #[error("Download of '{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The server answered with an empty body.
    #[error("Download of '{url}' returned an empty body")]
    EmptyBody { url: String },

    /// The payload does not start with the PDF magic bytes.
    #[error("'{url}' is not a PDF (first bytes: {magic:?})")]
    NotAPdf { url: String, magic: [u8; 4] },

    /// The PDF structure could not be decoded.
    #[error("Failed to parse PDF '{url}': {detail}")]
    ParseFailed { url: String, detail: String },

    /// The document could not be staged in the scratch area.
    #[error("Failed to stage '{url}' in scratch area: {detail}")]
    Scratch { url: String, detail: String },

    /// The blocking parse task panicked or was cancelled.
    #[error("Parse task for '{url}' aborted: {detail}")]
    TaskPanicked { url: String, detail: String },
}

impl DocumentError {
    /// The URL of the document that failed.
    pub fn url(&self) -> &str {
        match self {
            DocumentError::InvalidUrl { url, .. }
            | DocumentError::FetchFailed { url, .. }
            | DocumentError::FetchTimeout { url, .. }
            | DocumentError::HttpStatus { url, .. }
            | DocumentError::EmptyBody { url }
            | DocumentError::NotAPdf { url, .. }
            | DocumentError::ParseFailed { url, .. }
            | DocumentError::Scratch { url, .. }
            | DocumentError::TaskPanicked { url, .. } => url,
        }
    }

    /// Whether this was a fetch or a parse failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            DocumentError::InvalidUrl { .. }
            | DocumentError::FetchFailed { .. }
            | DocumentError::FetchTimeout { .. }
            | DocumentError::HttpStatus { .. }
            | DocumentError::EmptyBody { .. } => FailureKind::Fetch,
            DocumentError::NotAPdf { .. }
            | DocumentError::ParseFailed { .. }
            | DocumentError::Scratch { .. }
            | DocumentError::TaskPanicked { .. } => FailureKind::Parse,
        }
    }
}
