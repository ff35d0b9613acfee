//! Download pipeline: per-module orchestration of page acquisition, PDF
//! assembly, and cleanup
//!
//! The pipeline processes a module's documents strictly in order. For each
//! document it acquires page images one page at a time, merges whatever was
//! saved into a PDF, then removes the page images. Skipped and abandoned
//! documents are recorded in the summary, never raised as errors; only an
//! expired session or an unclassified transport failure aborts the job.

mod acquire;
mod tasks;

#[cfg(test)]
mod tests;

pub use tasks::run_job;

use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::assembly;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{HttpPageFetcher, PageSource};
use crate::types::{AcquisitionOutcome, JobRequest, JobSummary, Phase, ProgressEvent};

/// Capacity of the progress broadcast channel. Slow subscribers lag rather
/// than block the pipeline.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Downloads a module's documents and assembles them into PDFs
///
/// Cloning is cheap; clones share the page source and the progress channel.
#[derive(Clone)]
pub struct ModuleDownloader {
    config: Arc<Config>,
    source: Arc<dyn PageSource>,
    event_tx: broadcast::Sender<ProgressEvent>,
}

impl ModuleDownloader {
    /// Create a downloader backed by an HTTP page fetcher.
    ///
    /// Validates the configuration and builds the HTTP client up front, so a
    /// bad base URL or header fails here rather than mid-job.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let source = Arc::new(HttpPageFetcher::new(&config.network)?);
        Self::with_page_source(config, source)
    }

    /// Create a downloader with a custom page source.
    ///
    /// The seam for tests and for callers that fetch pages through something
    /// other than plain HTTP.
    pub fn with_page_source(config: Config, source: Arc<dyn PageSource>) -> Result<Self> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config: Arc::new(config),
            source,
            event_tx,
        })
    }

    /// Subscribe to progress events.
    ///
    /// Events are broadcast; every subscriber sees every event emitted after
    /// it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.event_tx.subscribe()
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Emit a progress event, ignoring the no-subscriber case
    pub(crate) fn emit_event(&self, event: ProgressEvent) {
        let _ = self.event_tx.send(event);
    }

    fn emit_phase(
        &self,
        phase: Phase,
        document: &str,
        message: impl Into<String>,
        page: Option<u32>,
        current_doc_index: usize,
        total_docs: usize,
    ) {
        self.emit_event(ProgressEvent {
            phase,
            document: document.to_string(),
            message: message.into(),
            page,
            current_doc_index,
            total_docs,
        });
    }

    /// Run one download job to completion, cancellation, or fatal error.
    ///
    /// Documents are processed sequentially in configured order. Each one is
    /// acquired, merged into a PDF, and has its page images cleaned up before
    /// the next document starts. Cancellation is honored between documents
    /// and between pages; a document interrupted mid-acquisition still gets
    /// its saved pages merged and cleaned up before the job stops.
    ///
    /// Returns `Err` only for job-fatal conditions: expired session cookies,
    /// unclassified transport errors, or I/O failures writing pages. In the
    /// fatal case the current document's pages are left on disk for a later
    /// resumed run.
    pub async fn process(
        &self,
        request: &JobRequest,
        cancel: CancellationToken,
    ) -> Result<JobSummary> {
        create_dir(&request.output_dir).await?;

        let documents = self.config.download.documents.clone();
        let total_docs = documents.len();
        let mut summary = JobSummary::default();

        info!(
            module = %request.module_code,
            documents = total_docs,
            output = %request.output_dir.display(),
            "starting job"
        );

        for (index, document) in documents.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(module = %request.module_code, "job cancelled");
                summary.cancelled = true;
                break;
            }

            let doc_dir = request.output_dir.join(document);
            create_dir(&doc_dir).await?;

            self.emit_phase(
                Phase::Starting,
                document,
                "Starting download",
                None,
                index,
                total_docs,
            );

            let result = self
                .acquire_document(document, &request.subfolder, &doc_dir, index, total_docs, &cancel)
                .await?;

            self.emit_phase(Phase::Merging, document, "Merging PDF", None, index, total_docs);

            if let Some(assembled) = self
                .assemble_and_clean(document, &doc_dir, &request.output_dir)
                .await?
            {
                summary.assembled.push(assembled);
            }

            let message = match result.outcome {
                AcquisitionOutcome::Completed => "Finished",
                AcquisitionOutcome::Skipped => {
                    summary.skipped.push(document.clone());
                    "Skipped (document not available)"
                }
                AcquisitionOutcome::Abandoned => {
                    summary.abandoned.push(document.clone());
                    "Abandoned after repeated errors"
                }
                AcquisitionOutcome::Cancelled => {
                    summary.cancelled = true;
                    "Stopped by user"
                }
            };
            self.emit_phase(Phase::Finished, document, message, None, index, total_docs);

            if summary.cancelled {
                break;
            }
        }

        info!(
            module = %request.module_code,
            assembled = summary.assembled.len(),
            skipped = summary.skipped.len(),
            abandoned = summary.abandoned.len(),
            cancelled = summary.cancelled,
            "job finished"
        );

        Ok(summary)
    }

    /// Merge a document's saved pages into a PDF on the blocking pool, then
    /// remove the page images.
    ///
    /// Assembly failures are logged and swallowed; the job continues with the
    /// next document and the page images are kept on disk for a later rerun.
    /// Only a panicked or aborted blocking task escapes as a job error.
    async fn assemble_and_clean(
        &self,
        document: &str,
        doc_dir: &Path,
        output_dir: &Path,
    ) -> Result<Option<crate::types::AssembledDocument>> {
        let doc = document.to_string();
        let image_dir = doc_dir.to_path_buf();
        let pdf_dir = output_dir.to_path_buf();

        let merged = tokio::task::spawn_blocking(move || {
            assembly::merge_images_to_pdf(&doc, &image_dir, &pdf_dir)
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        match merged {
            Ok(assembled) => {
                if let Some(assembled) = &assembled {
                    info!(
                        doc = %document,
                        pages = assembled.page_count,
                        path = %assembled.pdf_path.display(),
                        "document assembled"
                    );
                }
                assembly::cleanup_images(doc_dir).await;
                Ok(assembled)
            }
            Err(e) => {
                error!(doc = %document, error = %e, "PDF assembly failed, page images are kept");
                Ok(None)
            }
        }
    }
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        warn!(dir = %path.display(), error = %e, "failed to create directory");
        Error::Io(e)
    })
}
