//! Streaming extraction API: emit per-document outcomes as they complete.
//!
//! Batches of remote documents can take a while, mostly waiting on the
//! network. [`extract_stream`] yields each [`DocumentOutcome`] as soon as
//! its document has been fetched and parsed, so callers can report progress
//! or persist results incrementally. Outcomes arrive in completion order;
//! sort by `index` if submission order matters.
//!
//! The stream only covers the per-document stage. Unification, merging and
//! encoding need every document, so they stay with [`crate::extract`].

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::extract::{process_document, BatchContext};
use crate::output::DocumentOutcome;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-document outcomes.
pub type DocumentStream = Pin<Box<dyn Stream<Item = DocumentOutcome> + Send>>;

/// Process `urls` concurrently, yielding each document's outcome as it
/// completes.
///
/// The batch scratch directory lives as long as the stream; dropping the
/// stream cancels in-flight documents and removes it.
///
/// # Returns
/// - `Ok(DocumentStream)`, one item per URL
/// - `Err(ExtractError)` when `urls` is empty or the scratch area or HTTP
///   client cannot be created
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2table::{extract_stream, ExtractionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let urls = vec!["https://example.com/report.pdf".to_string()];
/// let mut stream = extract_stream(&urls, &ExtractionConfig::default())?;
/// while let Some(outcome) = stream.next().await {
///     match outcome.result {
///         Ok(doc) => println!("#{}: {} rows", outcome.index, doc.row_count()),
///         Err(e) => eprintln!("#{}: {e}", outcome.index),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn extract_stream<S: AsRef<str>>(
    urls: &[S],
    config: &ExtractionConfig,
) -> Result<DocumentStream, ExtractError> {
    if urls.is_empty() {
        return Err(ExtractError::NoDocuments);
    }
    info!("Starting streaming extraction: {} document(s)", urls.len());

    let ctx = Arc::new(BatchContext::new(config, urls.len())?);
    let owned: Vec<(usize, String)> = urls
        .iter()
        .enumerate()
        .map(|(index, url)| (index, url.as_ref().to_string()))
        .collect();

    let s = stream::iter(owned.into_iter().map(move |(index, url)| {
        process_document(Arc::clone(&ctx), index, url)
    }))
    .buffer_unordered(config.concurrency.max(1));

    Ok(Box::pin(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::InMemoryFetcher;

    #[tokio::test]
    async fn yields_one_outcome_per_url() {
        let fetcher = InMemoryFetcher::new().with_document("mem://bad", &b"not a pdf"[..]);
        let config = ExtractionConfig::builder()
            .fetcher(Arc::new(fetcher))
            .build()
            .unwrap();
        let urls = ["mem://bad", "mem://missing"];
        let mut outcomes: Vec<DocumentOutcome> =
            extract_stream(&urls, &config).unwrap().collect().await;
        outcomes.sort_by_key(|o| o.index);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_success()));
        assert_eq!(outcomes[1].url, "mem://missing");
    }

    #[test]
    fn empty_batch_is_rejected() {
        let urls: [&str; 0] = [];
        assert!(matches!(
            extract_stream(&urls, &ExtractionConfig::default()),
            Err(ExtractError::NoDocuments)
        ));
    }
}
