//! Combiner configuration.
//!
//! An explicit settings struct handed to [`crate::Combiner::new`]; there is no
//! ambient global state. Hosts that load configuration from a file can
//! deserialize this directly.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

// Default values for combiner configuration
const DEFAULT_REMOTE_SIZE_LIMIT: usize = 200_000;
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 3_000;

/// Settings for one [`crate::Combiner`] instance.
#[derive(Debug, Clone, Deserialize)]
pub struct CombinerConfig {
    /// Writable directory where combined artifacts are stored.
    pub cache_dir: PathBuf,
    /// Public base URL under which the cache directory is served.
    pub cache_base_url: String,
    /// Remote minification endpoint. Remote strategies are skipped when unset.
    #[serde(default)]
    pub remote_endpoint: Option<String>,
    /// Ceiling on the URL-encoded request size the remote service accepts.
    #[serde(default = "default_remote_size_limit")]
    pub remote_size_limit: usize,
    /// Timeout for a single remote minification request, in milliseconds.
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
}

fn default_remote_size_limit() -> usize {
    DEFAULT_REMOTE_SIZE_LIMIT
}

fn default_remote_timeout_ms() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_MS
}

impl CombinerConfig {
    /// Settings with default remote limits and no remote endpoint.
    pub fn new(cache_dir: impl Into<PathBuf>, cache_base_url: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            cache_base_url: cache_base_url.into(),
            remote_endpoint: None,
            remote_size_limit: DEFAULT_REMOTE_SIZE_LIMIT,
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }

    /// Enable the remote minification strategies against `endpoint`.
    pub fn with_remote_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.remote_endpoint = Some(endpoint.into());
        self
    }

    /// Returns the remote request timeout as a [`Duration`].
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Settings consumed by [`crate::telemetry::init`].
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CombinerConfig::new("/tmp/cache", "https://example.org/cache");
        assert!(config.remote_endpoint.is_none());
        assert_eq!(config.remote_size_limit, 200_000);
        assert_eq!(config.remote_timeout_ms, 3_000);
        assert_eq!(config.remote_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn with_remote_endpoint_sets_endpoint() {
        let config = CombinerConfig::new("/tmp/cache", "https://example.org/cache")
            .with_remote_endpoint("https://closure.example.org/compile");
        assert_eq!(
            config.remote_endpoint.as_deref(),
            Some("https://closure.example.org/compile")
        );
    }

    #[test]
    fn deserializes_with_field_defaults() {
        let config: CombinerConfig = serde_json::from_str(
            r#"{"cache_dir": "/tmp/cache", "cache_base_url": "https://example.org/cache"}"#,
        )
        .expect("minimal config should deserialize");
        assert_eq!(config.remote_size_limit, 200_000);
        assert_eq!(config.remote_timeout_ms, 3_000);
        assert!(config.remote_endpoint.is_none());
    }
}
