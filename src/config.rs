//! Service configuration.
//!
//! Everything the backend needs to know about its environment lives in one
//! [`ServiceConfig`], built either through [`ServiceConfig::builder()`] or from
//! environment variables with [`ServiceConfig::from_env()`]. The config is
//! handed to constructors explicitly so tests can point the pipeline at a
//! mock Tika server without touching process-global state.

use crate::error::Doc2TxtError;
use serde::Serialize;
use std::path::PathBuf;

/// Default Tika server base URL.
pub const DEFAULT_TIKA_ENDPOINT: &str = "http://localhost:9998";

/// Configuration for the doc2txt backend.
///
/// # Example
/// ```rust
/// use doc2txt::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .tika_endpoint("http://tika:9998/")
///     .port(8080)
///     .build()
///     .unwrap();
/// assert_eq!(config.tika_endpoint, "http://tika:9998");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    /// Base URL of the Tika server, without a trailing slash.
    /// Env: `TIKA_SERVER_ENDPOINT`. Default: `http://localhost:9998`.
    pub tika_endpoint: String,

    /// Timeout for a single Tika extraction call in seconds. Default: 300.
    ///
    /// Large scanned PDFs routinely take over a minute when Tika runs OCR.
    pub tika_timeout_secs: u64,

    /// Timeout for the `/health` probe against Tika in seconds. Default: 5.
    pub health_timeout_secs: u64,

    /// Address the HTTP server binds to. Default: `0.0.0.0`.
    pub host: String,

    /// Port the HTTP server binds to. Default: 8005.
    pub port: u16,

    /// HTTP worker threads. `None` lets actix pick one per core.
    pub workers: Option<usize>,

    /// Maximum accepted JSON body in bytes. Default: 64 MiB.
    ///
    /// The body carries the document as base64, so the largest accepted
    /// document is roughly three quarters of this.
    pub max_body_bytes: usize,

    /// Directory for the local extractor's temporary files.
    /// `None` uses the system temp dir.
    pub temp_dir: Option<PathBuf>,

    /// Path to a pdfium shared library. `None` binds the system library.
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tika_endpoint: DEFAULT_TIKA_ENDPOINT.to_string(),
            tika_timeout_secs: 300,
            health_timeout_secs: 5,
            host: "0.0.0.0".to_string(),
            port: 8005,
            workers: None,
            max_body_bytes: 64 * 1024 * 1024,
            temp_dir: None,
            pdfium_library_path: None,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from the process environment, falling back to defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `TIKA_SERVER_ENDPOINT` | `tika_endpoint` |
    /// | `DOC2TXT_TIKA_TIMEOUT` | `tika_timeout_secs` |
    /// | `DOC2TXT_HEALTH_TIMEOUT` | `health_timeout_secs` |
    /// | `DOC2TXT_HOST` | `host` |
    /// | `DOC2TXT_PORT` | `port` |
    /// | `DOC2TXT_WORKERS` | `workers` |
    /// | `DOC2TXT_MAX_BODY_MB` | `max_body_bytes` |
    /// | `DOC2TXT_TEMP_DIR` | `temp_dir` |
    /// | `PDFIUM_LIB_PATH` | `pdfium_library_path` |
    pub fn from_env() -> Result<Self, Doc2TxtError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`] but reads variables through
    /// `lookup`, so callers can feed a map instead of the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Doc2TxtError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(v) = get("TIKA_SERVER_ENDPOINT") {
            builder = builder.tika_endpoint(v);
        }
        if let Some(v) = get("DOC2TXT_TIKA_TIMEOUT") {
            builder = builder.tika_timeout_secs(parse_var("DOC2TXT_TIKA_TIMEOUT", &v)?);
        }
        if let Some(v) = get("DOC2TXT_HEALTH_TIMEOUT") {
            builder = builder.health_timeout_secs(parse_var("DOC2TXT_HEALTH_TIMEOUT", &v)?);
        }
        if let Some(v) = get("DOC2TXT_HOST") {
            builder = builder.host(v);
        }
        if let Some(v) = get("DOC2TXT_PORT") {
            builder = builder.port(parse_var("DOC2TXT_PORT", &v)?);
        }
        if let Some(v) = get("DOC2TXT_WORKERS") {
            builder = builder.workers(parse_var("DOC2TXT_WORKERS", &v)?);
        }
        if let Some(v) = get("DOC2TXT_MAX_BODY_MB") {
            let mb: usize = parse_var("DOC2TXT_MAX_BODY_MB", &v)?;
            builder = builder.max_body_bytes(mb.saturating_mul(1024 * 1024));
        }
        if let Some(v) = get("DOC2TXT_TEMP_DIR") {
            builder = builder.temp_dir(v);
        }
        if let Some(v) = get("PDFIUM_LIB_PATH") {
            builder = builder.pdfium_library_path(v);
        }

        builder.build()
    }

    /// Reopen this config for further overrides, e.g. CLI flags applied on
    /// top of [`ServiceConfig::from_env`].
    pub fn into_builder(self) -> ServiceConfigBuilder {
        ServiceConfigBuilder { config: self }
    }

    /// `host:port` string suitable for `HttpServer::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Doc2TxtError> {
    value.trim().parse().map_err(|_| {
        Doc2TxtError::InvalidConfig(format!("{key} has an invalid value: '{value}'"))
    })
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    /// Trailing slashes are trimmed so paths can be appended with `format!`.
    pub fn tika_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.tika_endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn tika_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tika_timeout_secs = secs;
        self
    }

    pub fn health_timeout_secs(mut self, secs: u64) -> Self {
        self.config.health_timeout_secs = secs;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = Some(n.max(1));
        self
    }

    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.config.max_body_bytes = bytes;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, Doc2TxtError> {
        let c = &self.config;
        if !(c.tika_endpoint.starts_with("http://") || c.tika_endpoint.starts_with("https://")) {
            return Err(Doc2TxtError::InvalidConfig(format!(
                "Tika endpoint must be an http(s) URL, got '{}'",
                c.tika_endpoint
            )));
        }
        if c.tika_timeout_secs == 0 || c.health_timeout_secs == 0 {
            return Err(Doc2TxtError::InvalidConfig("Timeouts must be ≥ 1s".into()));
        }
        if c.max_body_bytes == 0 {
            return Err(Doc2TxtError::InvalidConfig(
                "Maximum body size must be non-zero".into(),
            ));
        }
        if c.host.trim().is_empty() {
            return Err(Doc2TxtError::InvalidConfig("Host must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = ServiceConfig::default();
        assert_eq!(c.tika_endpoint, "http://localhost:9998");
        assert_eq!(c.port, 8005);
        assert_eq!(c.bind_addr(), "0.0.0.0:8005");
        assert!(c.temp_dir.is_none());
    }

    #[test]
    fn overrides_keep_environment_values() {
        let base = ServiceConfig::from_lookup(lookup_from(&[
            ("DOC2TXT_PORT", "9000"),
            ("DOC2TXT_TIKA_TIMEOUT", "42"),
        ]))
        .unwrap();
        let c = base.into_builder().port(9100).build().unwrap();
        assert_eq!(c.port, 9100);
        assert_eq!(c.tika_timeout_secs, 42);
        assert_eq!(c.health_timeout_secs, 5);
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let c = ServiceConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(c.tika_endpoint, DEFAULT_TIKA_ENDPOINT);
        assert_eq!(c.max_body_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn environment_overrides_fields() {
        let c = ServiceConfig::from_lookup(lookup_from(&[
            ("TIKA_SERVER_ENDPOINT", "http://tika:9998/"),
            ("DOC2TXT_PORT", "9000"),
            ("DOC2TXT_MAX_BODY_MB", "2"),
            ("DOC2TXT_TEMP_DIR", "/var/tmp/doc2txt"),
        ]))
        .unwrap();
        assert_eq!(c.tika_endpoint, "http://tika:9998");
        assert_eq!(c.port, 9000);
        assert_eq!(c.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(c.temp_dir, Some(PathBuf::from("/var/tmp/doc2txt")));
    }

    #[test]
    fn blank_variables_are_ignored() {
        let c = ServiceConfig::from_lookup(lookup_from(&[("TIKA_SERVER_ENDPOINT", "  ")])).unwrap();
        assert_eq!(c.tika_endpoint, DEFAULT_TIKA_ENDPOINT);
    }

    #[test]
    fn unparsable_port_is_rejected() {
        let err = ServiceConfig::from_lookup(lookup_from(&[("DOC2TXT_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("DOC2TXT_PORT"), "got: {err}");
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let err = ServiceConfig::builder()
            .tika_endpoint("tika:9998")
            .build()
            .unwrap_err();
        assert!(matches!(err, Doc2TxtError::InvalidConfig(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(ServiceConfig::builder().tika_timeout_secs(0).build().is_err());
        assert!(ServiceConfig::builder().health_timeout_secs(0).build().is_err());
    }
}
