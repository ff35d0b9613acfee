//! Job execution against a [`JobStore`]
//!
//! [`run_job`] wires a [`ModuleDownloader`] to a job store: it creates the
//! record, forwards progress events into it while the pipeline runs, and
//! records the terminal status and generated files when the pipeline stops.

use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use super::ModuleDownloader;
use crate::job_store::{JobStatus, JobStore};
use crate::types::JobRequest;

/// Run one download job and keep the job store up to date.
///
/// The job record is created in the `Queued` state and promoted to
/// `Processing` by the first progress event. Every event emitted by the
/// pipeline is forwarded into the store before the terminal status is
/// written. On return the record holds the terminal status: `Completed`,
/// `Cancelled` when the token fired, or `Failed` with the error message for
/// fatal errors. PDFs generated before a cancellation are recorded either
/// way.
pub async fn run_job(
    downloader: ModuleDownloader,
    store: Arc<dyn JobStore>,
    job_id: &str,
    request: JobRequest,
    cancel: CancellationToken,
) {
    store.create(job_id, &request.module_code).await;

    let mut events = downloader.subscribe();
    let forward_store = Arc::clone(&store);
    let forward_id = job_id.to_string();
    let pipeline_done = CancellationToken::new();
    let forwarder_done = pipeline_done.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => forward_store.update_progress(&forward_id, event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(job_id = %forward_id, missed, "progress forwarder lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = forwarder_done.cancelled() => {
                    // The pipeline is finished; flush the events still
                    // buffered so the last progress snapshot is recorded
                    // before the terminal status.
                    loop {
                        match events.try_recv() {
                            Ok(event) => {
                                forward_store.update_progress(&forward_id, event).await;
                            }
                            Err(TryRecvError::Lagged(missed)) => {
                                warn!(job_id = %forward_id, missed, "progress forwarder lagged");
                            }
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
    });

    let result = downloader.process(&request, cancel).await;
    pipeline_done.cancel();
    if forwarder.await.is_err() {
        warn!(job_id = %job_id, "progress forwarder panicked");
    }

    match result {
        Ok(summary) => {
            let files = summary
                .assembled
                .iter()
                .map(|doc| doc.pdf_path.clone())
                .collect();
            store.set_files(job_id, files).await;

            let status = if summary.cancelled {
                JobStatus::Cancelled
            } else {
                JobStatus::Completed
            };
            store.set_status(job_id, status, None).await;
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "job failed");
            store
                .set_status(job_id, JobStatus::Failed, Some(e.to_string()))
                .await;
        }
    }
}
