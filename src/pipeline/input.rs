//! Input resolution: download each document and stage it in the batch
//! scratch area.
//!
//! Every batch owns one [`ScratchArea`], a `TempDir` shared by reference
//! count between the document tasks. The directory is deleted when the last
//! reference is dropped, whichever way the batch ends: success, error,
//! cancellation or panic. We validate the PDF magic bytes (`%PDF`) before
//! staging so callers get a meaningful error rather than a parser failure.

use crate::error::{DocumentError, ExtractError};
use bytes::Bytes;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

/// Source of document bytes.
///
/// The default implementation is [`HttpFetcher`]. Supply your own through
/// [`crate::config::ExtractionConfigBuilder::fetcher`] to read from a cache,
/// an object store or memory.
pub trait DocumentFetcher: Send + Sync {
    /// Fetch the full body of `url`.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, DocumentError>>;
}

/// Fetches documents over HTTP(S) with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

impl DocumentFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, DocumentError>> {
        Box::pin(async move {
            let parsed = reqwest::Url::parse(url).map_err(|e| DocumentError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

            let classify = |e: reqwest::Error| {
                if e.is_timeout() {
                    DocumentError::FetchTimeout {
                        url: url.to_string(),
                        secs: self.timeout_secs,
                    }
                } else {
                    DocumentError::FetchFailed {
                        url: url.to_string(),
                        reason: e.to_string(),
                    }
                }
            };

            let response = self.client.get(parsed).send().await.map_err(classify)?;

            if !response.status().is_success() {
                return Err(DocumentError::HttpStatus {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                });
            }

            response.bytes().await.map_err(classify)
        })
    }
}

/// Serves documents from memory, keyed by URL.
///
/// Useful when the PDF bytes are already at hand (uploads, caches, tests).
/// Unknown URLs fail with HTTP 404.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFetcher {
    documents: HashMap<String, Bytes>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `url`, replacing any previous entry.
    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Bytes>) {
        self.documents.insert(url.into(), bytes.into());
    }

    pub fn with_document(mut self, url: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl DocumentFetcher for InMemoryFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, DocumentError>> {
        let result = self
            .documents
            .get(url)
            .cloned()
            .ok_or_else(|| DocumentError::HttpStatus {
                url: url.to_string(),
                status: 404,
            });
        Box::pin(async move { result })
    }
}

/// Fetch one document, enforcing `timeout_secs` regardless of the fetcher,
/// and check that the payload is a PDF.
pub async fn fetch_document(
    fetcher: &dyn DocumentFetcher,
    url: &str,
    timeout_secs: u64,
) -> Result<Bytes, DocumentError> {
    debug!("Fetching {}", url);

    let bytes = tokio::time::timeout(Duration::from_secs(timeout_secs), fetcher.fetch(url))
        .await
        .map_err(|_| DocumentError::FetchTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        })??;

    if bytes.is_empty() {
        return Err(DocumentError::EmptyBody {
            url: url.to_string(),
        });
    }

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(DocumentError::NotAPdf {
            url: url.to_string(),
            magic,
        });
    }

    debug!("Fetched {} ({} bytes)", url, bytes.len());
    Ok(bytes)
}

/// Batch-scoped working directory.
///
/// Dropping the value removes the directory and everything staged in it.
#[derive(Debug)]
pub struct ScratchArea {
    dir: TempDir,
}

impl ScratchArea {
    /// Create a fresh scratch directory, under `root` if given.
    pub fn new(root: Option<&Path>) -> Result<Self, ExtractError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdf2table-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|source| ExtractError::ScratchUnavailable { source })?;
        info!("Scratch area: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a fetched document into the scratch area and return its path.
    pub async fn stage(
        &self,
        index: usize,
        url: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, DocumentError> {
        let path = self
            .dir
            .path()
            .join(format!("{index:04}_{}.pdf", document_stem(url)));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DocumentError::Scratch {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        Ok(path)
    }
}

/// A filesystem-safe stem derived from the last URL path segment.
pub fn document_stem(url: &str) -> String {
    let last = reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| "document".to_string());

    let stem = last
        .rsplit_once('.')
        .map_or(last.as_str(), |(stem, _)| stem)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect::<String>();

    if stem.is_empty() {
        "document".to_string()
    } else {
        stem
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}
