//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator processes each document.
//!
//! Callers can forward events to a channel, a terminal progress bar or a
//! job record without the library knowing how the host application
//! communicates. The trait is `Send + Sync` because documents are processed
//! concurrently.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2table::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, url: &str, rows: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("#{index} {url}: {rows} rows");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each document.
///
/// All methods have default no-op implementations. `on_document_*` methods
/// may be called concurrently from different tasks; implementations must
/// synchronise any shared mutable state.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before any document is fetched.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document is fetched.
    ///
    /// * `index` — 0-based submission index
    fn on_document_start(&self, index: usize, url: &str) {
        let _ = (index, url);
    }

    /// Called when a document's pipeline finishes without error.
    ///
    /// * `rows` — data rows across the document's normalised tables
    ///   (0 when the PDF held no tables)
    fn on_document_complete(&self, index: usize, url: &str, rows: usize) {
        let _ = (index, url, rows);
    }

    /// Called when a document fails to fetch or parse.
    fn on_document_error(&self, index: usize, url: &str, error: &str) {
        let _ = (index, url, error);
    }

    /// Called once after every document has been attempted.
    ///
    /// * `success_count` — documents that completed without error
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        batch_total: AtomicUsize,
        batch_success: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_documents: usize) {
            self.batch_total.store(total_documents, Ordering::SeqCst);
        }

        fn on_document_start(&self, _index: usize, _url: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _index: usize, _url: &str, _rows: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _index: usize, _url: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total_documents: usize, success_count: usize) {
            self.batch_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start(0, "a");
        cb.on_document_complete(0, "a", 3);
        cb.on_document_error(1, "b", "timeout");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        tracker.on_document_start(0, "a");
        tracker.on_document_complete(0, "a", 10);
        tracker.on_document_start(1, "b");
        tracker.on_document_complete(1, "b", 0);
        tracker.on_document_start(2, "c");
        tracker.on_document_error(2, "c", "HTTP 404");
        tracker.on_batch_complete(3, 2);

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.batch_success.load(Ordering::SeqCst), 2);
    }
}
