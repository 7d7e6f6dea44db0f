//! End-to-end tests against live PDF URLs.
//!
//! These tests download real documents over HTTP. They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 E2E_PDF_URLS="https://…/a.pdf,https://…/b.pdf" \
//!     cargo test --test e2e -- --nocapture

use edgequake_pdf2table::{
    extract, extract_stream, ExtractError, ExtractionConfig, OutputFormat, OutputMode,
};
use futures::StreamExt;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED and E2E_PDF_URLS are set.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let urls: Vec<String> = std::env::var("E2E_PDF_URLS")
            .unwrap_or_default()
            .split(',')
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() {
            println!("SKIP — set E2E_PDF_URLS to a comma-separated list of PDF URLs");
            return;
        }
        urls
    }};
}

fn print_report(context: &str, report: &edgequake_pdf2table::BatchReport) {
    println!(
        "[{context}] {} rows, header {:?}, {}/{} ok, {} empty, {}ms",
        report.rows,
        report.global_header,
        report.succeeded,
        report.requested,
        report.empty,
        report.duration_ms
    );
    for failure in &report.failures {
        println!("[{context}]   ✗ #{} {}", failure.index, failure.error);
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_csv_batch() {
    let urls = e2e_skip_unless_ready!();
    let config = ExtractionConfig::builder()
        .fetch_timeout_secs(30)
        .build()
        .unwrap();

    match extract(&urls, &config).await {
        Ok(output) => {
            print_report("csv", &output.report);
            assert!(output.report.rows > 0);
            let mut reader = csv::Reader::from_reader(output.artifact.bytes.as_slice());
            let width = reader.headers().expect("CSV header").len();
            for record in reader.records() {
                assert_eq!(record.expect("well-formed record").len(), width);
            }
        }
        Err(ExtractError::NothingExtracted { requested, failed }) => {
            println!("[csv] no tables in {requested} document(s), {failed} failed");
        }
        Err(e) => panic!("unexpected error: {e}"),
    }
}

#[tokio::test]
async fn e2e_parquet_archive() {
    let urls = e2e_skip_unless_ready!();
    let config = ExtractionConfig::builder()
        .fetch_timeout_secs(30)
        .output_format(OutputFormat::Parquet)
        .output_mode(OutputMode::Archive)
        .build()
        .unwrap();

    if let Ok(output) = extract(&urls, &config).await {
        print_report("archive", &output.report);
        assert_eq!(&output.artifact.bytes[..2], b"PK");
    }
}

#[tokio::test]
async fn e2e_stream_yields_every_url() {
    let urls = e2e_skip_unless_ready!();
    let config = ExtractionConfig::builder()
        .fetch_timeout_secs(30)
        .build()
        .unwrap();

    let outcomes: Vec<_> = extract_stream(&urls, &config).unwrap().collect().await;
    assert_eq!(outcomes.len(), urls.len());
    for outcome in &outcomes {
        println!(
            "#{} {} → {} rows in {}ms",
            outcome.index,
            outcome.url,
            outcome.row_count(),
            outcome.duration_ms
        );
    }
}
