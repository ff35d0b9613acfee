//! Error types for pustaka-dl
//!
//! The taxonomy separates job-fatal failures (expired authentication,
//! unclassified transport errors) from document-local conditions that are
//! absorbed inside the pipeline and only surfaced through logs and progress
//! events (skipped documents, abandoned documents, assembly failures).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pustaka-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pustaka-dl
///
/// Only two classes of error escape a running job: `AuthExpired` (the server
/// rejected the session cookies) and unclassified transport or I/O failures.
/// Everything else is handled in place by the acquisition and assembly
/// pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The image endpoint returned 403: session cookies are no longer valid.
    ///
    /// This is job-fatal: acquisition stops immediately and documents not yet
    /// started are left untouched.
    #[error("authentication failed: session cookies expired")]
    AuthExpired,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "network.base_url")
        key: Option<String>,
    },

    /// Transport-layer error that fell outside the classified fetch outcomes
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF assembly error
    ///
    /// Assembly failures never abort a job; the orchestrator logs them and
    /// moves on. The variant exists so assembly internals can use `?`.
    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),
}

/// Errors produced while merging page images into a PDF
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A page image could not be decoded
    #[error("failed to decode page image {path}: {source}")]
    ImageDecode {
        /// The image file that failed to decode
        path: PathBuf,
        /// The underlying decode error
        source: image::ImageError,
    },

    /// A decoded page could not be re-encoded for embedding
    #[error("failed to encode page image {path}: {source}")]
    ImageEncode {
        /// The image file that failed to encode
        path: PathBuf,
        /// The underlying encode error
        source: image::ImageError,
    },

    /// The PDF document could not be built or written
    #[error("failed to write PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Filesystem error while reading page images or writing the PDF
    #[error("I/O error during assembly: {0}")]
    Io(#[from] std::io::Error),
}
