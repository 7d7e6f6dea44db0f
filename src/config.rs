//! Configuration types for batch table extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. One struct holds every knob so a
//! config can be shared across worker tasks, logged, and compared between
//! runs.

use crate::error::ExtractError;
use crate::pipeline::input::DocumentFetcher;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Upper bound for the default worker count.
pub const MAX_DEFAULT_CONCURRENCY: usize = 8;

/// Default worker count: the lesser of [`MAX_DEFAULT_CONCURRENCY`] and the
/// number of available CPUs.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_DEFAULT_CONCURRENCY)
}

/// Configuration for a batch extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2table::{ExtractionConfig, OutputFormat};
///
/// let config = ExtractionConfig::builder()
///     .concurrency(4)
///     .fetch_timeout_secs(20)
///     .output_format(OutputFormat::Parquet)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Number of documents processed at once. Default: `min(8, cores)`.
    ///
    /// Work is dominated by network fetches, so this bounds open
    /// connections as much as CPU use.
    pub concurrency: usize,

    /// Per-document download timeout in seconds. Default: 10.
    ///
    /// A timed-out document is reported as a failure; the rest of the batch
    /// carries on.
    pub fetch_timeout_secs: u64,

    /// Minimum share of non-numeric text cells for a row to count as a
    /// header. Range: (0, 1]. Default: 0.5.
    pub min_text_ratio: f32,

    /// Minimum number of cells a text line needs to join a table region.
    /// Default: 2.
    pub min_columns: usize,

    /// Header used when no first row of a document looks like a header.
    /// If None, `Column_0`, `Column_1`, … are synthesised.
    pub standard_header: Option<Vec<String>>,

    /// Output codec. Default: [`OutputFormat::Csv`].
    pub output_format: OutputFormat,

    /// One merged file or a zip of per-document files. Default: single file.
    pub output_mode: OutputMode,

    /// What to do with documents whose header width differs from the
    /// batch-wide header. Default: [`WidthMismatchPolicy::Union`].
    pub width_mismatch: WidthMismatchPolicy,

    /// Parent directory for the batch scratch area. If None, the system
    /// temp directory is used.
    pub scratch_root: Option<PathBuf>,

    /// Pre-constructed fetcher. If None, an HTTP fetcher is built per batch.
    pub fetcher: Option<Arc<dyn DocumentFetcher>>,

    /// Per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            fetch_timeout_secs: 10,
            min_text_ratio: 0.5,
            min_columns: 2,
            standard_header: None,
            output_format: OutputFormat::default(),
            output_mode: OutputMode::default(),
            width_mismatch: WidthMismatchPolicy::default(),
            scratch_root: None,
            fetcher: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("concurrency", &self.concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("min_text_ratio", &self.min_text_ratio)
            .field("min_columns", &self.min_columns)
            .field("standard_header", &self.standard_header)
            .field("output_format", &self.output_format)
            .field("output_mode", &self.output_mode)
            .field("width_mismatch", &self.width_mismatch)
            .field("scratch_root", &self.scratch_root)
            .field("fetcher", &self.fetcher.as_ref().map(|_| "<dyn DocumentFetcher>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Header-inference knobs derived from this config.
    pub fn header_rules(&self) -> crate::pipeline::header::HeaderRules {
        crate::pipeline::header::HeaderRules {
            min_text_ratio: self.min_text_ratio,
            standard_header: self.standard_header.clone(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn min_text_ratio(mut self, ratio: f32) -> Self {
        self.config.min_text_ratio = ratio;
        self
    }

    pub fn min_columns(mut self, n: usize) -> Self {
        self.config.min_columns = n.max(1);
        self
    }

    pub fn standard_header<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.standard_header = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.config.output_mode = mode;
        self
    }

    pub fn width_mismatch(mut self, policy: WidthMismatchPolicy) -> Self {
        self.config.width_mismatch = policy;
        self
    }

    pub fn scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = Some(dir.into());
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        self.config.fetcher = Some(fetcher);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(ExtractError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.fetch_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "Fetch timeout must be ≥ 1s".into(),
            ));
        }
        if !(c.min_text_ratio > 0.0 && c.min_text_ratio <= 1.0) {
            return Err(ExtractError::InvalidConfig(format!(
                "Minimum text ratio must be in (0, 1], got {}",
                c.min_text_ratio
            )));
        }
        if c.standard_header.as_ref().is_some_and(Vec::is_empty) {
            return Err(ExtractError::InvalidConfig(
                "Standard header must name at least one column".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Serialisation format of the output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values with a header row. (default)
    #[default]
    Csv,
    /// Apache Parquet, one column per merged column.
    Parquet,
}

impl OutputFormat {
    /// Conventional media type for the format.
    pub fn media_type(self) -> &'static str {
        match self {
            OutputFormat::Csv => "text/csv",
            OutputFormat::Parquet => "application/vnd.apache.parquet",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }

    /// Suggested filename for a single merged artifact.
    pub fn filename(self) -> String {
        format!("final_extracted_data.{}", self.extension())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            _ => Err(ExtractError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// Whether the batch produces one merged file or one file per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// A single merged table. (default)
    #[default]
    SingleFile,
    /// A zip archive holding each document's unified table.
    Archive,
}

/// Handling of documents whose header width differs from the global header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthMismatchPolicy {
    /// Align by column name; unknown columns are appended to the merged
    /// header and absent ones left missing. (default)
    #[default]
    Union,
    /// Leave the document out of the merge.
    Exclude,
}

impl FromStr for WidthMismatchPolicy {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" => Ok(WidthMismatchPolicy::Union),
            "exclude" => Ok(WidthMismatchPolicy::Exclude),
            other => Err(ExtractError::InvalidConfig(format!(
                "Unknown width-mismatch policy '{other}' (expected union or exclude)"
            ))),
        }
    }
}
