//! # edgequake-pdf2table
//!
//! Harvest tables from batches of remote PDF documents and merge them into
//! one dataset (CSV or Parquet).
//!
//! ## Why this crate?
//!
//! Tables published as PDFs rarely agree with each other: headers repeat on
//! every page, some pages lose their header entirely, and documents from the
//! same source rename or reorder columns over time. This crate reads every
//! table it can find, infers each document's header by majority vote,
//! reconciles headers across documents and drops the noise before writing a
//! single file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URLs
//!  │
//!  ├─ 1. Fetch      concurrent downloads, per-document timeout
//!  ├─ 2. Read       lopdf content streams → raw tables (spawn_blocking)
//!  ├─ 3. Infer      most frequent valid first row → document header
//!  ├─ 4. Normalise  pad/truncate rows, de-duplicate column names
//!  ├─ 5. Unify      most common header across documents
//!  ├─ 6. Clean      drop blank rows and repeated headers
//!  └─ 7. Encode     CSV | Parquet | zip of per-document files
//! ```
//!
//! A document that fails to download or parse is logged and left out; the
//! rest of the batch carries on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2table::{extract, ExtractionConfig, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let urls = vec![
//!         "https://example.com/q1.pdf".to_string(),
//!         "https://example.com/q2.pdf".to_string(),
//!     ];
//!     let config = ExtractionConfig::builder()
//!         .output_format(OutputFormat::Parquet)
//!         .build()?;
//!     let output = extract(&urls, &config).await?;
//!     std::fs::write(&output.artifact.filename, &output.artifact.bytes)?;
//!     eprintln!(
//!         "{} rows, {} failed document(s)",
//!         output.report.rows, output.report.failed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2table` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2table = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, OutputFormat, OutputMode, WidthMismatchPolicy,
};
pub use error::{DocumentError, ExtractError, FailureKind};
pub use extract::{extract, extract_sync, extract_tables, extract_to_file};
pub use output::{BatchReport, DocumentFailure, DocumentOutcome, ExtractionOutput, OutputArtifact};
pub use pipeline::input::{DocumentFetcher, HttpFetcher, InMemoryFetcher};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{extract_stream, DocumentStream};
pub use table::{Cell, DocumentResult, HeaderSource, MergedTable, NormalizedTable, RawTable};
