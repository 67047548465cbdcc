//! Context configuration.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default upload chunk: 10 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// OData JSON flavour spoken on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonFormat {
    /// Plain JSON with `@odata.*` annotations.
    #[default]
    Minimal,
    /// `{"d": ...}` wrapped bodies with `__metadata`.
    Verbose,
}

impl JsonFormat {
    pub fn media_type(&self) -> &'static str {
        match self {
            JsonFormat::Minimal => "application/json",
            JsonFormat::Verbose => "application/json;odata=verbose",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub enabled: bool,
    pub max_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_batch_size: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Absolute URL every resource path is resolved against.
    pub service_root: String,
    pub timeout_secs: u64,
    pub json_format: JsonFormat,
    pub batch: BatchConfig,
    pub upload_chunk_size: u64,
    /// Sent with every request, e.g. `Authorization`.
    pub default_headers: HashMap<String, String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            service_root: String::new(),
            timeout_secs: 30,
            json_format: JsonFormat::default(),
            batch: BatchConfig::default(),
            upload_chunk_size: DEFAULT_CHUNK_SIZE,
            default_headers: HashMap::new(),
        }
    }
}

impl ContextConfig {
    pub fn new(service_root: impl Into<String>) -> Self {
        Self {
            service_root: service_root.into(),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    #[must_use]
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    #[must_use]
    pub fn with_batching(mut self, max_batch_size: usize) -> Self {
        self.batch = BatchConfig {
            enabled: true,
            max_batch_size,
        };
        self
    }

    /// Timeouts are kept in whole seconds; a fraction rounds up.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let fraction = u64::from(timeout.subsec_nanos() > 0);
        self.timeout_secs = timeout.as_secs().saturating_add(fraction);
        self
    }

    #[must_use]
    pub fn with_upload_chunk_size(mut self, size: u64) -> Self {
        self.upload_chunk_size = size;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Bearer token sent as `Authorization`.
    #[must_use]
    pub fn with_access_token(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {}", token))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the settings and return the parsed service root.
    pub fn validate(&self) -> Result<Url> {
        if self.service_root.is_empty() {
            return Err(Error::config("service_root is required"));
        }
        let root = Url::parse(&self.service_root)?;
        if !matches!(root.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "service_root must be http or https, got {}",
                root.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be greater than zero"));
        }
        if self.batch.enabled && self.batch.max_batch_size == 0 {
            return Err(Error::config("batch.max_batch_size must be greater than zero"));
        }
        if self.upload_chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ContextConfig::new("https://graph.microsoft.com/v1.0");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.json_format, JsonFormat::Minimal);
        assert!(!config.batch.enabled);
        assert_eq!(config.batch.max_batch_size, 20);
        assert_eq!(config.upload_chunk_size, 10 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = ContextConfig::from_json_str(
            r#"{
                "service_root": "https://contoso.sharepoint.com/_api",
                "json_format": "verbose",
                "batch": {"enabled": true}
            }"#,
        )
        .unwrap();
        assert_eq!(config.json_format, JsonFormat::Verbose);
        assert!(config.batch.enabled);
        assert_eq!(config.batch.max_batch_size, 20);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"service_root": "https://graph.microsoft.com/v1.0", "timeout_secs": 5}}"#
        )
        .unwrap();

        let config = ContextConfig::from_file(file.path()).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ContextConfig::from_file("/nonexistent/o365.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn validation() {
        assert!(matches!(
            ContextConfig::default().validate(),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            ContextConfig::new("not a url").validate(),
            Err(Error::Url(_))
        ));
        assert!(matches!(
            ContextConfig::new("ftp://example.com").validate(),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            ContextConfig::new("https://example.com").with_batching(0).validate(),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            ContextConfig::new("https://example.com")
                .with_upload_chunk_size(0)
                .validate(),
            Err(Error::InvalidChunkSize)
        ));
    }

    #[test]
    fn sub_second_timeout_rounds_up() {
        let config =
            ContextConfig::new("https://example.com").with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert!(config.validate().is_ok());

        let config =
            ContextConfig::new("https://example.com").with_timeout(Duration::from_millis(2500));
        assert_eq!(config.timeout_secs, 3);
        let config = ContextConfig::new("https://example.com").with_timeout(Duration::from_secs(4));
        assert_eq!(config.timeout_secs, 4);
    }

    #[test]
    fn access_token_header() {
        let config = ContextConfig::new("https://example.com").with_access_token("abc");
        assert_eq!(
            config.default_headers.get("Authorization").map(String::as_str),
            Some("Bearer abc")
        );
    }
}
