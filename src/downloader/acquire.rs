//! Per-document acquisition loop
//!
//! Pages are fetched strictly in order starting at 1. A page already on disk
//! is counted and skipped without a request, which is what makes interrupted
//! jobs resumable: rerunning a job re-fetches only the missing tail. The
//! loop has no page-count limit; it runs until the server signals the end,
//! the failure budget is exhausted, the session expires, or cancellation is
//! requested.

use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ModuleDownloader;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::types::{AcquisitionOutcome, AcquisitionResult, FetchOutcome, Phase, ProgressEvent};

impl ModuleDownloader {
    /// Acquire one document's pages into `doc_dir`.
    ///
    /// Returns the saved page paths in page order together with the terminal
    /// condition. `Err` is reserved for job-fatal conditions: an expired
    /// session, an unclassified transport error, or a filesystem failure.
    pub(crate) async fn acquire_document(
        &self,
        document: &str,
        subfolder: &str,
        doc_dir: &Path,
        doc_index: usize,
        total_docs: usize,
        cancel: &CancellationToken,
    ) -> Result<AcquisitionResult> {
        let mut pages = Vec::new();
        let mut page: u32 = 1;
        let mut retry = RetryPolicy::new(&self.config().retry);

        loop {
            if cancel.is_cancelled() {
                info!(doc = %document, page, "acquisition cancelled");
                return Ok(AcquisitionResult {
                    pages,
                    outcome: AcquisitionOutcome::Cancelled,
                });
            }

            let path = doc_dir.join(format!("{page}.jpg"));
            if tokio::fs::try_exists(&path).await? {
                debug!(doc = %document, page, "page already on disk, skipping fetch");
                pages.push(path);
                page += 1;
                continue;
            }

            self.emit_event(ProgressEvent {
                phase: Phase::Downloading,
                document: document.to_string(),
                message: format!("Downloading page {page}"),
                page: Some(page),
                current_doc_index: doc_index,
                total_docs,
            });

            match self.source.fetch_page(document, subfolder, page).await? {
                FetchOutcome::Saved(body) => {
                    tokio::fs::write(&path, &body).await?;
                    debug!(doc = %document, page, bytes = body.len(), "page saved");
                    retry.reset();
                    pages.push(path);
                    page += 1;
                }
                FetchOutcome::EndOfDocument => {
                    info!(doc = %document, pages = pages.len(), "end of document");
                    return Ok(AcquisitionResult {
                        pages,
                        outcome: AcquisitionOutcome::Completed,
                    });
                }
                FetchOutcome::DocumentAbsent => {
                    info!(doc = %document, "document not available, skipping");
                    return Ok(AcquisitionResult {
                        pages,
                        outcome: AcquisitionOutcome::Skipped,
                    });
                }
                FetchOutcome::AuthExpired => {
                    warn!(doc = %document, page, "session cookies rejected, aborting job");
                    return Err(Error::AuthExpired);
                }
                FetchOutcome::Transient { reason } => {
                    if retry.record_failure() {
                        warn!(
                            doc = %document,
                            page,
                            reason,
                            "too many consecutive errors, abandoning document"
                        );
                        return Ok(AcquisitionResult {
                            pages,
                            outcome: AcquisitionOutcome::Abandoned,
                        });
                    }
                    warn!(
                        doc = %document,
                        page,
                        reason,
                        failures = retry.consecutive_failures(),
                        "transient failure, retrying page"
                    );
                    retry.backoff().await;
                }
            }
        }
    }
}
