//! Shared helpers for downloader tests

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::fetcher::PageSource;
use crate::types::FetchOutcome;

/// Page source driven by per-document scripts.
///
/// Each fetch pops the next outcome from the document's script; a document
/// with no script (or an exhausted one) answers `EndOfDocument`. All requests
/// are recorded for assertions. An optional trigger cancels a token when a
/// specific (document, page) is fetched, which lets tests cancel a job from
/// inside the pipeline deterministically.
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<FetchOutcome>>>,
    requests: Mutex<Vec<(String, u32)>>,
    cancel_on: Option<(String, u32, CancellationToken)>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            cancel_on: None,
        }
    }

    /// Queue the outcomes returned for a document, in fetch order
    pub fn script(self, document: &str, outcomes: Vec<FetchOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(document.to_string(), outcomes.into());
        self
    }

    /// Cancel `token` when the given (document, page) is fetched
    pub fn cancel_on(mut self, document: &str, page: u32, token: CancellationToken) -> Self {
        self.cancel_on = Some((document.to_string(), page, token));
        self
    }

    /// All (document, page) pairs fetched so far
    pub fn requests(&self) -> Vec<(String, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(&self, doc: &str, _subfolder: &str, page: u32) -> Result<FetchOutcome> {
        self.requests
            .lock()
            .unwrap()
            .push((doc.to_string(), page));

        if let Some((cancel_doc, cancel_page, token)) = &self.cancel_on {
            if cancel_doc == doc && *cancel_page == page {
                token.cancel();
            }
        }

        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(doc)
            .and_then(VecDeque::pop_front)
            .unwrap_or(FetchOutcome::EndOfDocument);
        Ok(outcome)
    }
}

/// A small valid JPEG, usable as a fetched page body
pub fn jpeg_page() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(6, 8, image::Rgb([120, 120, 120]));
    let mut buf = Vec::new();
    img.write_with_encoder(JpegEncoder::new(&mut buf)).unwrap();
    buf
}

/// Config with the given document list and no retry delay
pub fn test_config(documents: &[&str]) -> Config {
    let mut config = Config::default();
    config.download.documents = documents.iter().map(ToString::to_string).collect();
    config.retry.retry_delay = Duration::ZERO;
    config.retry.jitter = false;
    config
}

/// Shorthand for a transient fetch outcome
pub fn transient() -> FetchOutcome {
    FetchOutcome::Transient {
        reason: "connection timed out".to_string(),
    }
}
