//! Pipeline tests: orchestration, events, cancellation, and the job runner

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use super::support::{ScriptedSource, jpeg_page, test_config, transient};
use crate::downloader::{ModuleDownloader, run_job};
use crate::error::Error;
use crate::job_store::{InMemoryJobStore, JobStatus, JobStore};
use crate::types::{FetchOutcome, JobRequest, Phase};

fn request_for(temp: &TempDir) -> JobRequest {
    JobRequest {
        module_code: "TEST1".to_string(),
        subfolder: "TEST1/".to_string(),
        output_dir: temp.path().to_path_buf(),
    }
}

fn saved() -> FetchOutcome {
    FetchOutcome::Saved(jpeg_page())
}

fn pdf_page_count(path: &Path) -> usize {
    lopdf::Document::load(path).unwrap().get_pages().len()
}

#[tokio::test]
async fn job_assembles_documents_and_cleans_working_dirs() {
    let source = Arc::new(
        ScriptedSource::new()
            .script("A", vec![saved(), saved(), saved(), FetchOutcome::EndOfDocument])
            .script("B", vec![FetchOutcome::DocumentAbsent]),
    );
    let downloader =
        ModuleDownloader::with_page_source(test_config(&["A", "B"]), source).unwrap();
    let temp = TempDir::new().unwrap();
    let request = request_for(&temp);

    let summary = downloader
        .process(&request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.assembled.len(), 1);
    assert_eq!(summary.assembled[0].document, "A");
    assert_eq!(summary.assembled[0].page_count, 3);
    assert_eq!(summary.skipped, vec!["B"]);
    assert!(summary.abandoned.is_empty());
    assert!(!summary.cancelled);

    let a_pdf = temp.path().join("A.pdf");
    assert!(a_pdf.exists());
    assert_eq!(pdf_page_count(&a_pdf), 3);
    assert!(!temp.path().join("B.pdf").exists());

    // Working directories are gone, only the PDFs remain
    assert!(!temp.path().join("A").exists());
    assert!(!temp.path().join("B").exists());
}

#[tokio::test]
async fn events_trace_the_pipeline_phases() {
    let source = Arc::new(
        ScriptedSource::new()
            .script("A", vec![saved(), FetchOutcome::EndOfDocument])
            .script("B", vec![FetchOutcome::DocumentAbsent]),
    );
    let downloader =
        ModuleDownloader::with_page_source(test_config(&["A", "B"]), source).unwrap();
    let temp = TempDir::new().unwrap();

    let mut events = downloader.subscribe();
    downloader
        .process(&request_for(&temp), CancellationToken::new())
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    let phases: Vec<(Phase, &str, Option<u32>)> = seen
        .iter()
        .map(|e| (e.phase, e.document.as_str(), e.page))
        .collect();
    assert_eq!(
        phases,
        vec![
            (Phase::Starting, "A", None),
            (Phase::Downloading, "A", Some(1)),
            (Phase::Downloading, "A", Some(2)),
            (Phase::Merging, "A", None),
            (Phase::Finished, "A", None),
            (Phase::Starting, "B", None),
            (Phase::Downloading, "B", Some(1)),
            (Phase::Merging, "B", None),
            (Phase::Finished, "B", None),
        ]
    );

    // Every event carries the document progress counters
    assert!(seen.iter().all(|e| e.total_docs == 2));
    assert_eq!(seen[0].current_doc_index, 0);
    assert_eq!(seen.last().unwrap().current_doc_index, 1);
    assert!(seen.last().unwrap().message.contains("Skipped"));
}

#[tokio::test]
async fn expired_session_aborts_without_touching_later_documents() {
    let source = Arc::new(
        ScriptedSource::new().script("A", vec![saved(), FetchOutcome::AuthExpired]),
    );
    let downloader =
        ModuleDownloader::with_page_source(test_config(&["A", "B"]), source).unwrap();
    let temp = TempDir::new().unwrap();

    let err = downloader
        .process(&request_for(&temp), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AuthExpired));

    // The interrupted document keeps its pages for a resumed run; no PDF was
    // written and the next document was never started.
    assert!(temp.path().join("A/1.jpg").exists());
    assert!(!temp.path().join("A.pdf").exists());
    assert!(!temp.path().join("B").exists());
}

#[tokio::test]
async fn abandoned_document_still_produces_a_partial_pdf() {
    let source = Arc::new(ScriptedSource::new().script(
        "A",
        vec![saved(), transient(), transient(), transient(), transient()],
    ));
    let downloader = ModuleDownloader::with_page_source(test_config(&["A"]), source).unwrap();
    let temp = TempDir::new().unwrap();

    let summary = downloader
        .process(&request_for(&temp), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.abandoned, vec!["A"]);
    assert_eq!(summary.assembled.len(), 1);
    assert_eq!(summary.assembled[0].page_count, 1);
    assert!(temp.path().join("A.pdf").exists());
    assert!(!temp.path().join("A").exists(), "working dir is still cleaned");
}

#[tokio::test]
async fn cancellation_mid_document_finishes_that_document_only() {
    let cancel = CancellationToken::new();
    let source = Arc::new(
        ScriptedSource::new()
            .script("A", vec![saved(), FetchOutcome::EndOfDocument])
            .script("B", vec![saved(), saved()])
            .cancel_on("B", 2, cancel.clone()),
    );
    let downloader =
        ModuleDownloader::with_page_source(test_config(&["A", "B", "C"]), source).unwrap();
    let temp = TempDir::new().unwrap();

    let summary = downloader.process(&request_for(&temp), cancel).await.unwrap();

    assert!(summary.cancelled);
    // A completed normally, B was interrupted after two pages but still got
    // merged and cleaned, C was never started.
    assert_eq!(summary.assembled.len(), 2);
    assert_eq!(summary.assembled[1].document, "B");
    assert_eq!(summary.assembled[1].page_count, 2);
    assert!(temp.path().join("A.pdf").exists());
    assert!(temp.path().join("B.pdf").exists());
    assert!(!temp.path().join("B").exists());
    assert!(!temp.path().join("C").exists());
}

#[tokio::test]
async fn run_job_records_completion_in_the_store() {
    let source = Arc::new(
        ScriptedSource::new().script("A", vec![saved(), FetchOutcome::EndOfDocument]),
    );
    let downloader = ModuleDownloader::with_page_source(test_config(&["A"]), source).unwrap();
    let temp = TempDir::new().unwrap();
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());

    run_job(
        downloader,
        Arc::clone(&store),
        "job-1",
        request_for(&temp),
        CancellationToken::new(),
    )
    .await;

    let record = store.get("job-1").await.unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.module_code, "TEST1");
    assert_eq!(record.files, vec![temp.path().join("A.pdf")]);
    assert!(record.error.is_none());
}

#[tokio::test]
async fn run_job_flushes_the_final_progress_event_before_finishing() {
    let source = Arc::new(
        ScriptedSource::new().script("A", vec![saved(), FetchOutcome::EndOfDocument]),
    );
    let downloader = ModuleDownloader::with_page_source(test_config(&["A"]), source).unwrap();
    let temp = TempDir::new().unwrap();
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());

    run_job(
        downloader,
        Arc::clone(&store),
        "job-1",
        request_for(&temp),
        CancellationToken::new(),
    )
    .await;

    // The last event of the pipeline reaches the store, not merely the last
    // one the forwarder happened to see before the job finished.
    let record = store.get("job-1").await.unwrap();
    let progress = record.progress.unwrap();
    assert_eq!(progress.phase, Phase::Finished);
    assert_eq!(progress.document, "A");
    assert_eq!(record.status, JobStatus::Completed);
}

#[tokio::test]
async fn run_job_records_failure_with_the_error_message() {
    let source = Arc::new(ScriptedSource::new().script("A", vec![FetchOutcome::AuthExpired]));
    let downloader = ModuleDownloader::with_page_source(test_config(&["A"]), source).unwrap();
    let temp = TempDir::new().unwrap();
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());

    run_job(
        downloader,
        Arc::clone(&store),
        "job-1",
        request_for(&temp),
        CancellationToken::new(),
    )
    .await;

    let record = store.get("job-1").await.unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(
        record.error.as_deref().unwrap_or("").contains("authentication"),
        "error should name the cause: {:?}",
        record.error
    );
}

#[tokio::test]
async fn run_job_records_cancellation() {
    let source = Arc::new(ScriptedSource::new());
    let downloader = ModuleDownloader::with_page_source(test_config(&["A"]), source).unwrap();
    let temp = TempDir::new().unwrap();
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());

    let cancel = CancellationToken::new();
    cancel.cancel();
    run_job(
        downloader,
        Arc::clone(&store),
        "job-1",
        request_for(&temp),
        cancel,
    )
    .await;

    let record = store.get("job-1").await.unwrap();
    assert_eq!(record.status, JobStatus::Cancelled);
    assert!(record.files.is_empty());
}
