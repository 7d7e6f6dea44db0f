//! Eager (whole-batch) extraction entry points.
//!
//! Every document runs through its own fetch → read → infer → normalise
//! pipeline, at most `concurrency` at a time. A failing document produces a
//! [`DocumentOutcome`] holding the error and is left out of the merge; it
//! never aborts the batch. Once every document has resolved, outcomes are
//! put back in submission order, unified, merged, cleaned and encoded.
//!
//! Use [`crate::stream::extract_stream`] instead to observe per-document
//! outcomes as they complete.

use crate::config::{ExtractionConfig, OutputMode, WidthMismatchPolicy};
use crate::error::{DocumentError, ExtractError};
use crate::output::{BatchReport, DocumentFailure, DocumentOutcome, ExtractionOutput, OutputArtifact};
use crate::pipeline::cleanup::{self, CleanupStats};
use crate::pipeline::encode;
use crate::pipeline::header::{infer_header, HeaderRules};
use crate::pipeline::input::{self, DocumentFetcher, HttpFetcher, ScratchArea};
use crate::pipeline::normalize::normalize_document;
use crate::pipeline::reader::TableReader;
use crate::pipeline::unify::{self, UnifiedBatch};
use crate::table::{DocumentResult, HeaderSource, MergedTable, RawTable};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Name of the archive produced in [`OutputMode::Archive`].
pub const ARCHIVE_FILENAME: &str = "extracted_tables.zip";

/// Extract, unify and encode the tables of every document in `urls`.
///
/// # Returns
/// `Ok(ExtractionOutput)` when at least one row survived, even if some
/// documents failed (see `output.report.failures`).
///
/// # Errors
/// - [`ExtractError::NoDocuments`] when `urls` is empty
/// - [`ExtractError::NothingExtracted`] when no document yielded a row
/// - [`ExtractError::Encode`] when serialisation fails
pub async fn extract<S: AsRef<str>>(
    urls: &[S],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let start = Instant::now();
    let (batch, mut report) = run_batch(urls, config).await?;

    let artifact = match config.output_mode {
        OutputMode::SingleFile => {
            let merged = merge_and_clean(&batch, config.width_mismatch, &mut report)?;
            let bytes = encode::encode_table(&merged, config.output_format)?;
            OutputArtifact {
                bytes,
                media_type: config.output_format.media_type().to_string(),
                filename: config.output_format.filename(),
            }
        }
        OutputMode::Archive => encode_per_document(&batch, config, &mut report)?,
    };

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: {} rows from {}/{} documents, {}ms",
        report.rows, report.succeeded, report.requested, report.duration_ms
    );
    Ok(ExtractionOutput { artifact, report })
}

/// Extract, unify and merge without encoding.
pub async fn extract_tables<S: AsRef<str>>(
    urls: &[S],
    config: &ExtractionConfig,
) -> Result<(MergedTable, BatchReport), ExtractError> {
    let start = Instant::now();
    let (batch, mut report) = run_batch(urls, config).await?;
    let merged = merge_and_clean(&batch, config.width_mismatch, &mut report)?;
    report.duration_ms = start.elapsed().as_millis() as u64;
    Ok((merged, report))
}

/// Extract and write the artifact directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file<S: AsRef<str>>(
    urls: &[S],
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchReport, ExtractError> {
    let output = extract(urls, config).await?;
    let path = output_path.as_ref();
    let write_err = |e: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, &output.artifact.bytes)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    Ok(output.report)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync<S: AsRef<str>>(
    urls: &[S],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(urls, config))
}

// ── Batch context ────────────────────────────────────────────────────────

/// Everything a document task needs, shared by reference count.
///
/// Holding the context keeps the scratch directory alive; it is removed
/// once the last task and the batch itself have let go.
pub(crate) struct BatchContext {
    pub(crate) fetcher: Arc<dyn DocumentFetcher>,
    pub(crate) scratch: Arc<ScratchArea>,
    pub(crate) config: ExtractionConfig,
    pub(crate) rules: HeaderRules,
    pub(crate) total: usize,
}

impl BatchContext {
    pub(crate) fn new(config: &ExtractionConfig, total: usize) -> Result<Self, ExtractError> {
        let fetcher: Arc<dyn DocumentFetcher> = match &config.fetcher {
            Some(fetcher) => Arc::clone(fetcher),
            None => Arc::new(HttpFetcher::new(config.fetch_timeout_secs)?),
        };
        let scratch = Arc::new(ScratchArea::new(config.scratch_root.as_deref())?);
        Ok(Self {
            fetcher,
            scratch,
            config: config.clone(),
            rules: config.header_rules(),
            total,
        })
    }
}

/// Run one document through fetch → read → infer → normalise.
pub(crate) async fn process_document(
    ctx: Arc<BatchContext>,
    index: usize,
    url: String,
) -> DocumentOutcome {
    let start = Instant::now();
    if let Some(ref cb) = ctx.config.progress_callback {
        cb.on_document_start(index, &url);
    }
    debug!("Document #{}/{}: {}", index + 1, ctx.total, url);

    let result = run_document(&ctx, index, &url).await;

    match &result {
        Ok(doc) => {
            debug!(
                "Document #{} done: {} table(s), {} row(s)",
                index,
                doc.tables.len(),
                doc.row_count()
            );
            if let Some(ref cb) = ctx.config.progress_callback {
                cb.on_document_complete(index, &url, doc.row_count());
            }
        }
        Err(e) => {
            warn!("Document #{} ({}) failed: {}", index, url, e);
            if let Some(ref cb) = ctx.config.progress_callback {
                cb.on_document_error(index, &url, &e.to_string());
            }
        }
    }

    DocumentOutcome {
        index,
        url,
        result,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

async fn run_document(
    ctx: &Arc<BatchContext>,
    index: usize,
    url: &str,
) -> Result<DocumentResult, DocumentError> {
    let bytes =
        input::fetch_document(ctx.fetcher.as_ref(), url, ctx.config.fetch_timeout_secs).await?;
    let path = ctx.scratch.stage(index, url, &bytes).await?;
    drop(bytes);

    let scratch = Arc::clone(&ctx.scratch);
    let rules = ctx.rules.clone();
    let min_columns = ctx.config.min_columns;
    let owned_url = url.to_string();

    tokio::task::spawn_blocking(move || {
        let _scratch = scratch;
        parse_document(index, &owned_url, &path, min_columns, &rules)
    })
    .await
    .map_err(|e| DocumentError::TaskPanicked {
        url: url.to_string(),
        detail: e.to_string(),
    })?
}

/// Read, infer and normalise one staged PDF. Blocking.
pub fn parse_document(
    index: usize,
    url: &str,
    path: &Path,
    min_columns: usize,
    rules: &HeaderRules,
) -> Result<DocumentResult, DocumentError> {
    let reader = TableReader::open(path, min_columns).map_err(|e| DocumentError::ParseFailed {
        url: url.to_string(),
        detail: e.to_string(),
    })?;
    let tables: Vec<RawTable> = reader.tables().collect();
    debug!("{}: {} raw table(s) over {} page(s)", url, tables.len(), reader.page_count());

    match infer_header(&tables, rules) {
        Some((header, source)) => Ok(normalize_document(index, url, &tables, header, source)),
        None => Ok(DocumentResult {
            index,
            url: url.to_string(),
            header: Vec::new(),
            header_source: HeaderSource::Placeholder,
            tables: Vec::new(),
        }),
    }
}

// ── Fan-out / fan-in ─────────────────────────────────────────────────────

async fn run_batch<S: AsRef<str>>(
    urls: &[S],
    config: &ExtractionConfig,
) -> Result<(UnifiedBatch, BatchReport), ExtractError> {
    if urls.is_empty() {
        return Err(ExtractError::NoDocuments);
    }
    let total = urls.len();
    info!(
        "Starting extraction: {} document(s), concurrency {}",
        total, config.concurrency
    );

    let ctx = Arc::new(BatchContext::new(config, total)?);
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut outcomes: Vec<DocumentOutcome> = stream::iter(urls.iter().enumerate().map(|(index, url)| {
        process_document(Arc::clone(&ctx), index, url.as_ref().to_string())
    }))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;
    drop(ctx);

    outcomes.sort_by_key(|o| o.index);
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, succeeded);
    }

    fold_outcomes(outcomes, total)
}

/// Split outcomes into successful non-empty documents and a report, then
/// unify the documents' headers.
pub(crate) fn fold_outcomes(
    outcomes: Vec<DocumentOutcome>,
    requested: usize,
) -> Result<(UnifiedBatch, BatchReport), ExtractError> {
    let mut report = BatchReport {
        requested,
        ..Default::default()
    };
    let mut documents = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(doc) if doc.is_empty() => {
                report.succeeded += 1;
                report.empty += 1;
            }
            Ok(doc) => {
                report.succeeded += 1;
                documents.push(doc);
            }
            Err(error) => {
                report.failed += 1;
                report.failures.push(DocumentFailure::new(outcome.index, error));
            }
        }
    }

    let nothing = || ExtractError::NothingExtracted {
        requested,
        failed: report.failed,
    };
    let batch = unify::unify(documents).ok_or_else(nothing)?;

    report.global_header = batch.global_header.clone();
    report.remapped_documents = batch.remapped.clone();
    report.mismatched_documents = batch.mismatched.clone();
    Ok((batch, report))
}

// ── Merge / encode ───────────────────────────────────────────────────────

fn merge_and_clean(
    batch: &UnifiedBatch,
    policy: WidthMismatchPolicy,
    report: &mut BatchReport,
) -> Result<MergedTable, ExtractError> {
    let (mut merged, mut stats) =
        cleanup::merge_documents(&batch.documents, &batch.global_header, policy);
    stats += cleanup::cleanup(&mut merged);

    report.tables = batch
        .documents
        .iter()
        .filter(|d| included(d, batch, policy))
        .map(|d| d.tables.len())
        .sum();
    record_cleanup(report, stats, merged.row_count());

    if merged.is_empty() {
        return Err(ExtractError::NothingExtracted {
            requested: report.requested,
            failed: report.failed,
        });
    }
    Ok(merged)
}

fn included(doc: &DocumentResult, batch: &UnifiedBatch, policy: WidthMismatchPolicy) -> bool {
    policy == WidthMismatchPolicy::Union || doc.header.len() == batch.global_header.len()
}

fn record_cleanup(report: &mut BatchReport, stats: CleanupStats, rows: usize) {
    report.dropped_blank_rows += stats.blank_rows;
    report.dropped_header_rows += stats.header_rows;
    report.rows += rows;
}

/// One encoded file per contributing document, zipped.
fn encode_per_document(
    batch: &UnifiedBatch,
    config: &ExtractionConfig,
    report: &mut BatchReport,
) -> Result<OutputArtifact, ExtractError> {
    let format = config.output_format;
    let mut entries = Vec::new();

    for doc in &batch.documents {
        if !included(doc, batch, config.width_mismatch) {
            continue;
        }
        let mut table = MergedTable::new(doc.header.clone());
        let header_rows = cleanup::append_document(&mut table, doc);
        let mut stats = cleanup::cleanup(&mut table);
        stats.header_rows += header_rows;
        record_cleanup(report, stats, table.row_count());
        if table.is_empty() {
            continue;
        }
        report.tables += doc.tables.len();

        let name = format!(
            "{:03}_{}.{}",
            doc.index,
            input::document_stem(&doc.url),
            format.extension()
        );
        entries.push((name, encode::encode_table(&table, format)?));
    }

    if entries.is_empty() {
        return Err(ExtractError::NothingExtracted {
            requested: report.requested,
            failed: report.failed,
        });
    }

    Ok(OutputArtifact {
        bytes: encode::encode_archive(&entries)?,
        media_type: "application/zip".to_string(),
        filename: ARCHIVE_FILENAME.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, NormalizedTable};

    fn outcome(index: usize, header: &[&str], rows: usize) -> DocumentOutcome {
        let columns: Vec<String> = header.iter().map(|s| s.to_string()).collect();
        let data = (0..rows)
            .map(|i| vec![Cell::Numeric(i.to_string()); columns.len()])
            .collect::<Vec<_>>();
        let tables = if rows == 0 {
            Vec::new()
        } else {
            vec![NormalizedTable::new(1, 0, columns.clone(), data)]
        };
        DocumentOutcome {
            index,
            url: format!("https://example.com/{index}.pdf"),
            result: Ok(DocumentResult {
                index,
                url: format!("https://example.com/{index}.pdf"),
                header: columns,
                header_source: HeaderSource::Inferred,
                tables,
            }),
            duration_ms: 1,
        }
    }

    fn failed(index: usize) -> DocumentOutcome {
        let url = format!("https://example.com/{index}.pdf");
        DocumentOutcome {
            index,
            url: url.clone(),
            result: Err(DocumentError::HttpStatus { url, status: 500 }),
            duration_ms: 1,
        }
    }

    #[test]
    fn fold_counts_each_outcome() {
        let outcomes = vec![outcome(0, &["A", "B"], 2), outcome(1, &["A", "B"], 0), failed(2)];
        let (batch, report) = fold_outcomes(outcomes, 3).unwrap();
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.empty, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].index, 2);
        assert_eq!(batch.documents.len(), 1);
        assert_eq!(report.global_header, vec!["A", "B"]);
    }

    #[test]
    fn fold_without_tables_is_nothing_extracted() {
        let err = fold_outcomes(vec![outcome(0, &["A"], 0), failed(1)], 2).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::NothingExtracted {
                requested: 2,
                failed: 1
            }
        ));
        assert!(err.is_empty_result());
    }

    #[test]
    fn merge_reports_tables_and_rows() {
        let (batch, mut report) =
            fold_outcomes(vec![outcome(0, &["A", "B"], 2), outcome(1, &["X", "Y"], 1)], 2).unwrap();
        let merged = merge_and_clean(&batch, WidthMismatchPolicy::Union, &mut report).unwrap();
        assert_eq!(merged.columns, vec!["A", "B"]);
        assert_eq!(report.rows, 3);
        assert_eq!(report.tables, 2);
        assert_eq!(report.remapped_documents, vec![1]);
    }

    #[tokio::test]
    async fn no_urls_is_rejected() {
        let urls: Vec<String> = Vec::new();
        let err = extract(&urls, &ExtractionConfig::default()).await.unwrap_err();
        assert!(matches!(err, ExtractError::NoDocuments));
    }
}
