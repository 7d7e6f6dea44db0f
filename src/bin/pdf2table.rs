//! CLI binary for edgequake-pdf2table.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and writes the artifact.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2table::{
    extract, BatchReport, ExtractError, ExtractionConfig, ExtractionProgressCallback, OutputFormat,
    OutputMode, ProgressCallback, WidthMismatchPolicy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar with one log line per finished document. Documents
/// complete out of order, so start times are tracked per index.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&index))
            .map_or(0.0, |t| t.elapsed().as_secs_f64())
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting tables from {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, index: usize, url: &str) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(index, Instant::now());
        }
        self.bar.set_message(url.to_string());
    }

    fn on_document_complete(&self, index: usize, url: &str, rows: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} #{:<3} {}  {}  {}",
            green("✓"),
            index,
            url,
            dim(&format!("{rows:>5} rows")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, url: &str, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} #{:<3} {}  {}  {}",
            red("✗"),
            index,
            url,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} documents processed",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents processed  ({} failed)",
                if failed == total_documents {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Merge the tables of two reports into final_extracted_data.csv
  pdf2table https://example.com/q1.pdf https://example.com/q2.pdf

  # Parquet output to a chosen path
  pdf2table --format parquet -o data/q.parquet https://example.com/q1.pdf

  # One file per document, zipped
  pdf2table --archive --urls-file urls.txt

  # Fallback header for documents without a recognisable one
  pdf2table --standard-header "Date,Item,Amount" --urls-file urls.txt

  # Print the batch report as JSON
  pdf2table --json --no-progress --urls-file urls.txt > report.json

URLS FILE:
  One URL per line. Blank lines and lines starting with '#' are ignored.
"#;

/// Extract tables from remote PDF documents into one CSV or Parquet file.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2table",
    version,
    about = "Extract tables from remote PDF documents into one CSV or Parquet file",
    long_about = "Download PDF documents, detect their tables, reconcile headers within and \
across documents, and write a single merged CSV or Parquet file (or a zip with one file per \
document).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// HTTP/HTTPS URLs of PDF documents.
    urls: Vec<String>,

    /// Read additional URLs from this file, one per line.
    #[arg(long, env = "PDF2TABLE_URLS_FILE")]
    urls_file: Option<PathBuf>,

    /// Output format: csv or parquet.
    #[arg(short, long, env = "PDF2TABLE_FORMAT", default_value = "csv")]
    format: String,

    /// Write a zip archive with one file per document.
    #[arg(long, env = "PDF2TABLE_ARCHIVE")]
    archive: bool,

    /// Output path. Default: the suggested filename in the current directory.
    #[arg(short, long, env = "PDF2TABLE_OUTPUT")]
    output: Option<PathBuf>,

    /// Number of documents processed concurrently. Default: min(8, CPUs).
    #[arg(short, long, env = "PDF2TABLE_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Per-document download timeout in seconds.
    #[arg(long, env = "PDF2TABLE_TIMEOUT", default_value_t = 10)]
    timeout: u64,

    /// Minimum share of text cells in a header row (0–1].
    #[arg(long, env = "PDF2TABLE_MIN_TEXT_RATIO", default_value_t = 0.5)]
    min_text_ratio: f32,

    /// Minimum cells per line for a line to belong to a table.
    #[arg(long, env = "PDF2TABLE_MIN_COLUMNS", default_value_t = 2)]
    min_columns: usize,

    /// Comma-separated header used when none can be inferred.
    #[arg(long, env = "PDF2TABLE_STANDARD_HEADER", value_delimiter = ',')]
    standard_header: Option<Vec<String>>,

    /// Documents whose header width differs from the batch header: union or exclude.
    #[arg(long, env = "PDF2TABLE_WIDTH_MISMATCH", default_value = "union")]
    width_mismatch: String,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "PDF2TABLE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2TABLE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2TABLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2TABLE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let urls = collect_urls(&cli).await?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = match extract(&urls, &config).await {
        Ok(output) => output,
        Err(e @ ExtractError::NothingExtracted { .. }) => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(2);
        }
        Err(e) => return Err(e).context("Extraction failed"),
    };

    let path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&output.artifact.filename));
    write_atomic(&path, &output.artifact.bytes).await?;

    if cli.json {
        let json =
            serde_json::to_string_pretty(&output.report).context("Failed to serialise report")?;
        println!("{json}");
    }

    if !cli.quiet {
        print_summary(&output.report, &path);
    }

    Ok(())
}

/// Positional URLs followed by those in `--urls-file`.
async fn collect_urls(cli: &Cli) -> Result<Vec<String>> {
    let mut urls = cli.urls.clone();
    if let Some(ref path) = cli.urls_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read URLs from {:?}", path))?;
        urls.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    if urls.is_empty() {
        anyhow::bail!("No URLs given (pass them as arguments or with --urls-file)");
    }
    Ok(urls)
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let format: OutputFormat = cli.format.parse().context("Invalid --format")?;
    let width_mismatch: WidthMismatchPolicy = cli
        .width_mismatch
        .parse()
        .context("Invalid --width-mismatch")?;

    let mut builder = ExtractionConfig::builder()
        .output_format(format)
        .output_mode(if cli.archive {
            OutputMode::Archive
        } else {
            OutputMode::SingleFile
        })
        .fetch_timeout_secs(cli.timeout)
        .min_text_ratio(cli.min_text_ratio)
        .min_columns(cli.min_columns)
        .width_mismatch(width_mismatch);

    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(ref header) = cli.standard_header {
        builder = builder.standard_header(header.iter().map(|h| h.trim().to_string()));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Write to a temp file next to `path`, then rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    tokio::fs::write(&tmp_path, bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp_path))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

fn print_summary(report: &BatchReport, path: &Path) {
    eprintln!(
        "{}  {} rows × {} columns  from {}/{} documents  {}ms  →  {}",
        if report.failed == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        report.rows,
        report.global_header.len(),
        report.succeeded - report.empty,
        report.requested,
        report.duration_ms,
        bold(&path.display().to_string()),
    );
    if report.dropped_blank_rows + report.dropped_header_rows > 0 {
        eprintln!(
            "   {}",
            dim(&format!(
                "dropped {} blank and {} repeated-header rows",
                report.dropped_blank_rows, report.dropped_header_rows
            ))
        );
    }
    if !report.mismatched_documents.is_empty() {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} document(s) with a different column count: {:?}",
                report.mismatched_documents.len(),
                report.mismatched_documents
            ))
        );
    }
    for failure in &report.failures {
        eprintln!("   {} #{} {}", red("✗"), failure.index, failure.error);
    }
}
