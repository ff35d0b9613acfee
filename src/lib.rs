//! # pustaka-dl
//!
//! Async library for downloading Universitas Terbuka course modules from the
//! pustaka reader and assembling them into PDFs.
//!
//! A job walks a module's documents in order (`DAFIS`, `TINJAUAN`, `M1`..`M9`
//! by default). For each document it fetches page images one at a time until
//! the server signals the end, merges the saved pages into one PDF, and
//! removes the page images. Interrupted jobs are resumable: pages already on
//! disk are never re-fetched.
//!
//! ## Quick start
//!
//! ```no_run
//! use pustaka_dl::{Config, JobRequest, ModuleDownloader};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> pustaka_dl::Result<()> {
//! let mut config = Config::default();
//! config
//!     .network
//!     .apply_session("ADBI421103", "<PHPSESSID>", "<sucuri cookie>");
//!
//! let downloader = ModuleDownloader::new(config)?;
//!
//! let mut events = downloader.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("[{}] {}", event.document, event.message);
//!     }
//! });
//!
//! let request = JobRequest::for_module("ADBI421103");
//! let summary = downloader.process(&request, CancellationToken::new()).await?;
//! println!("{} PDFs written", summary.assembled.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`]: one HTTP request per page, classified into a typed outcome
//! - [`downloader`]: the per-document acquisition loop and job orchestration
//! - [`retry`]: consecutive-failure budget with reset-on-success
//! - [`assembly`]: page-image to PDF merging and post-merge cleanup
//! - [`job_store`]: pluggable job status storage for embedding in services
//!
//! Skipped documents (not on the server) and abandoned documents (too many
//! consecutive errors) are reported through the [`JobSummary`], not as
//! errors; only an expired session or an unclassified transport failure
//! aborts a job.

#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod assembly;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod job_store;
pub mod retry;
pub mod types;

pub use config::{Config, DownloadConfig, NetworkConfig, RetryConfig};
pub use downloader::{ModuleDownloader, run_job};
pub use error::{AssemblyError, Error, Result};
pub use fetcher::{HttpPageFetcher, PageSource};
pub use job_store::{InMemoryJobStore, JobRecord, JobStatus, JobStore};
pub use retry::RetryPolicy;
pub use types::{
    AcquisitionOutcome, AcquisitionResult, AssembledDocument, FetchOutcome, JobRequest,
    JobSummary, Phase, ProgressEvent,
};
