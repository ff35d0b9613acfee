//! Core types for pustaka-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Request describing one download job: which module to fetch and where the
/// output goes.
///
/// The document list itself comes from [`crate::config::DownloadConfig`]; a
/// request only carries the per-job parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Module code, e.g. `ADBI421103` (used for logging and job records)
    pub module_code: String,
    /// Subfolder query parameter sent with every page request
    pub subfolder: String,
    /// Directory that receives the per-document working directories and the
    /// final PDFs
    pub output_dir: PathBuf,
}

impl JobRequest {
    /// Build a request with the conventional layout for a module code:
    /// `subfolder = "<code>/"` and `output_dir = downloads/<code>`.
    pub fn for_module(module_code: impl Into<String>) -> Self {
        let module_code = module_code.into();
        Self {
            subfolder: format!("{module_code}/"),
            output_dir: PathBuf::from("downloads").join(&module_code),
            module_code,
        }
    }
}

/// Classified result of a single page fetch
///
/// Produced by [`crate::fetcher::PageSource::fetch_page`] and consumed
/// immediately by the acquisition loop; never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// HTTP 200 with an image content-type; the body is the page image
    Saved(Vec<u8>),
    /// HTTP 200 with a non-image content-type: the server's signal that no
    /// more pages exist
    EndOfDocument,
    /// HTTP 404 on the first page: the document does not exist at all
    DocumentAbsent,
    /// HTTP 403: session cookies expired (job-fatal)
    AuthExpired,
    /// Timeout, connection failure, or an unclassified HTTP status
    Transient {
        /// Human-readable description of what went wrong
        reason: String,
    },
}

/// How acquisition for one document ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionOutcome {
    /// The server signalled end-of-document; all pages were saved
    Completed,
    /// The document does not exist (404 on page 1); nothing was saved
    Skipped,
    /// The consecutive-error budget was exhausted; pages saved so far are kept
    Abandoned,
    /// Cancellation was requested; pages saved so far are kept
    Cancelled,
}

/// Per-document acquisition result: the saved page files in order, plus how
/// the loop terminated
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquisitionResult {
    /// Paths of the saved page images, ordered by page number
    pub pages: Vec<PathBuf>,
    /// Terminal condition of the acquisition loop
    pub outcome: AcquisitionOutcome,
}

/// A document whose pages were merged into a PDF
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledDocument {
    /// Document name, e.g. `M3`
    pub document: String,
    /// Path of the written PDF
    pub pdf_path: PathBuf,
    /// Number of pages in the PDF
    pub page_count: usize,
}

/// Pipeline phase a progress event belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Acquisition for a document is about to begin
    Starting,
    /// A page image is being fetched
    Downloading,
    /// Saved page images are being merged into a PDF
    Merging,
    /// The document finished processing (normally, skipped, or abandoned)
    Finished,
}

/// Progress snapshot emitted at phase boundaries
///
/// Read-only for consumers; delivered through the broadcast channel returned
/// by [`crate::ModuleDownloader::subscribe`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Pipeline phase
    pub phase: Phase,
    /// Document the event refers to
    pub document: String,
    /// Human-readable message
    pub message: String,
    /// Page number, present for per-page events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Zero-based index of the document in the configured list
    pub current_doc_index: usize,
    /// Total number of documents in the job
    pub total_docs: usize,
}

/// Summary returned by [`crate::ModuleDownloader::process`]
///
/// Skipped and abandoned documents are silent at the API boundary (not
/// errors); the summary is how callers learn about them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Documents that produced a PDF
    pub assembled: Vec<AssembledDocument>,
    /// Documents skipped because they do not exist on the server
    pub skipped: Vec<String>,
    /// Documents abandoned after exhausting the retry budget
    pub abandoned: Vec<String>,
    /// True if the job stopped because cancellation was requested
    pub cancelled: bool,
}
