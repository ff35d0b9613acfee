//! Configuration types for pustaka-dl

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Network configuration: endpoint, session headers, request timeout
///
/// Authentication is entirely delegated to the headers; the library never
/// interprets credentials. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// URL of the page-image endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Headers sent with every request (user agent, cookies, referer)
    #[serde(default = "default_headers")]
    pub headers: HashMap<String, String>,

    /// Per-request timeout (default: 20 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            headers: default_headers(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl NetworkConfig {
    /// Install the session cookies and referer for a module.
    ///
    /// The reader endpoint authenticates through a `PHPSESSID` cookie plus a
    /// Sucuri challenge cookie, and expects the referer of the module's
    /// reader page.
    pub fn apply_session(
        &mut self,
        module_code: &str,
        phpsessid: &str,
        sucuri_cookie: &str,
    ) {
        self.headers.insert(
            "Referer".to_string(),
            format!("https://pustaka.ut.ac.id/reader/index.php?modul={module_code}"),
        );
        self.headers.insert(
            "Cookie".to_string(),
            format!("PHPSESSID={phpsessid}; {sucuri_cookie}"),
        );
    }
}

/// Download behavior configuration (document list, output location)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Base output directory used by [`crate::JobRequest::for_module`]
    /// (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Ordered document list processed per job (default: the standard module
    /// layout `DAFIS, TINJAUAN, M1..M9`)
    #[serde(default = "default_documents")]
    pub documents: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            documents: default_documents(),
        }
    }
}

/// Retry configuration for transient page-fetch failures
///
/// The budget counts *consecutive* failures on one document and resets on
/// every successful save; it is not a total-attempts cap.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum consecutive failures before a document is abandoned
    /// (default: 3)
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Delay before retrying the same page (default: 500 ms, 0 disables)
    #[serde(default = "default_retry_delay", with = "duration_millis_serde")]
    pub retry_delay: Duration,

    /// Add random jitter to the retry delay (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_consecutive_failures(),
            retry_delay: default_retry_delay(),
            jitter: true,
        }
    }
}

/// Main configuration for [`crate::ModuleDownloader`]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Download configuration
    #[serde(default)]
    pub download: DownloadConfig,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Validate the configuration.
    ///
    /// Called by [`crate::ModuleDownloader::new`]; checks that the base URL
    /// parses, the document list is non-empty, and the timeout is non-zero.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.network.base_url).map_err(|e| Error::Config {
            message: format!("base URL '{}' is not a valid URL: {e}", self.network.base_url),
            key: Some("network.base_url".to_string()),
        })?;

        if self.download.documents.is_empty() {
            return Err(Error::Config {
                message: "document list is empty".to_string(),
                key: Some("download.documents".to_string()),
            });
        }

        if self.network.request_timeout.is_zero() {
            return Err(Error::Config {
                message: "request timeout must be greater than zero".to_string(),
                key: Some("network.request_timeout".to_string()),
            });
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "https://pustaka.ut.ac.id/reader/services/view.php".to_string()
}

fn default_headers() -> HashMap<String, String> {
    HashMap::from([
        (
            "User-Agent".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36"
                .to_string(),
        ),
        (
            "sec-ch-ua".to_string(),
            "\"Chromium\";v=\"142\", \"Google Chrome\";v=\"142\", \"Not_A Brand\";v=\"99\""
                .to_string(),
        ),
        ("sec-ch-ua-mobile".to_string(), "?0".to_string()),
        ("sec-ch-ua-platform".to_string(), "\"macOS\"".to_string()),
    ])
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_documents() -> Vec<String> {
    ["DAFIS", "TINJAUAN", "M1", "M2", "M3", "M4", "M5", "M6", "M7", "M8", "M9"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, for sub-second delays)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
    }

    #[test]
    fn default_document_list_matches_module_layout() {
        let config = Config::default();
        assert_eq!(config.download.documents.len(), 11);
        assert_eq!(config.download.documents[0], "DAFIS");
        assert_eq!(config.download.documents[1], "TINJAUAN");
        assert_eq!(config.download.documents[10], "M9");
    }

    #[test]
    fn default_timeout_is_twenty_seconds() {
        let config = Config::default();
        assert_eq!(config.network.request_timeout, Duration::from_secs(20));
    }

    #[test]
    fn default_retry_budget_is_three() {
        let config = Config::default();
        assert_eq!(config.retry.max_consecutive_failures, 3);
    }

    #[test]
    fn invalid_base_url_fails_validation() {
        let config = Config {
            network: NetworkConfig {
                base_url: "not a url".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("network.base_url"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn empty_document_list_fails_validation() {
        let config = Config {
            download: DownloadConfig {
                documents: vec![],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let config = Config {
            network: NetworkConfig {
                request_timeout: Duration::ZERO,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn apply_session_sets_referer_and_cookie() {
        let mut network = NetworkConfig::default();
        network.apply_session("ADBI421103", "abc123", "sucuricp_tfca_x=y");

        assert_eq!(
            network.headers.get("Referer").unwrap(),
            "https://pustaka.ut.ac.id/reader/index.php?modul=ADBI421103"
        );
        assert_eq!(
            network.headers.get("Cookie").unwrap(),
            "PHPSESSID=abc123; sucuricp_tfca_x=y"
        );
    }

    #[test]
    fn config_deserializes_from_partial_json() {
        let json = r#"{
            "download": { "documents": ["A", "B"] },
            "retry": { "retry_delay": 0 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.download.documents, vec!["A", "B"]);
        assert_eq!(config.retry.retry_delay, Duration::ZERO);
        // Untouched sections keep their defaults
        assert_eq!(config.network.request_timeout, Duration::from_secs(20));
        assert!(config.retry.jitter);
    }

    #[test]
    fn timeout_serializes_as_whole_seconds() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["network"]["request_timeout"], 20);
        assert_eq!(json["retry"]["retry_delay"], 500);
    }
}
