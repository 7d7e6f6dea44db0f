//! Pipeline stages for PDF table extraction.
//!
//! Each submodule implements one transformation step and can be tested on
//! its own.
//!
//! ## Data Flow
//!
//! ```text
//!            per document (concurrent)                     per batch
//! ┌────────────────────────────────────────────┐
//! input ──▶ reader ──▶ header ──▶ normalize ──┼──▶ unify ──▶ cleanup ──▶ encode
//! (fetch)   (lopdf)    (infer)    (reshape)   │   (schema)   (merge)    (csv/parquet)
//! └────────────────────────────────────────────┘
//! ```
//!
//! 1. [`input`]     — download each PDF, check its magic bytes and stage it
//!    in the batch scratch area
//! 2. [`reader`]    — recover text lines from page content streams and group
//!    multi-cell lines into raw tables; runs in `spawn_blocking`
//! 3. [`header`]    — pick the most frequent first row that looks like a
//!    header, or fall back to a standard or placeholder header
//! 4. [`normalize`] — pad/truncate rows to the header and de-duplicate names
//! 5. [`unify`]     — choose the batch-wide header and rename same-width
//!    documents onto it
//! 6. [`cleanup`]   — concatenate and drop blank and repeated-header rows
//! 7. [`encode`]    — serialise to CSV, Parquet or a zip archive

pub mod cleanup;
pub mod encode;
pub mod header;
pub mod input;
pub mod normalize;
pub mod reader;
pub mod unify;
