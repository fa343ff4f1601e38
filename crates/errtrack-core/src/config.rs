//! Configuration module for errtrack.
//!
//! Provides the typed [`TrackerConfig`] that maps to the YAML configuration
//! file, with loading, environment overrides, validation, defaults, and a
//! builder for programmatic use. The configuration is loaded once at startup
//! and shared read-only (`Arc<TrackerConfig>`) for the process lifetime.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::FaultKind;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Dashboard URL used when none is configured.
pub const DEFAULT_DASHBOARD_URL: &str = "http://error-tracker.test";

/// Environments that report faults by default.
pub const DEFAULT_ENVIRONMENTS: &[&str] = &["production", "staging", "testing", "development"];

/// Fault kinds excluded from reporting by default.
pub const DEFAULT_EXCLUDED_KINDS: &[&str] = &["http.not_found", "http.method_not_allowed", "validation"];

/// Header names whose values are always redacted.
pub const DEFAULT_SENSITIVE_HEADERS: &[&str] =
    &["authorization", "cookie", "x-csrf-token", "x-xsrf-token"];

/// Body field name substrings whose values are redacted.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "password_confirmation",
    "token",
    "secret",
    "api_key",
];

/// Per-attempt HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Number of delivery attempts.
pub const DEFAULT_RETRY: u32 = 3;

/// Environment variables consulted by [`TrackerConfig::apply_env_overrides`].
pub const ENV_API_KEY: &str = "ERROR_TRACKER_API_KEY";
pub const ENV_APP_ID: &str = "ERROR_TRACKER_APP_ID";
pub const ENV_DASHBOARD_URL: &str = "ERROR_TRACKER_DASHBOARD_URL";
pub const ENV_ENABLED: &str = "ERROR_TRACKER_ENABLED";

// ---------------------------------------------------------------------------
// TrackerConfig with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for errtrack.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Bearer token for the collection endpoint.
    pub api_key: String,
    /// Identifier of this application on the dashboard.
    pub app_id: String,
    /// Base URL of the dashboard; always contacted over https.
    pub dashboard_url: String,
    /// Global switch.
    pub enabled: bool,
    /// Environments whose faults are reported. Anything else is ignored.
    pub environments: BTreeSet<String>,
    /// Fault kinds (and their subkinds) that are never reported.
    pub exclude_exceptions: Vec<FaultKind>,
    pub http_client: HttpClientConfig,
    pub privacy: PrivacyConfig,
}

/// Delivery client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Per-attempt timeout in seconds.
    pub timeout: u64,
    /// Number of delivery attempts. Zero disables delivery entirely.
    pub retry: u32,
    /// Verify the endpoint's TLS certificate.
    pub verify_tls: bool,
}

/// Redaction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Header names (case-insensitive) whose values are redacted.
    pub sanitize_request_headers: Vec<String>,
    /// Field name substrings (case-insensitive) whose values are redacted.
    pub sanitize_request_fields: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            app_id: String::new(),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            enabled: true,
            environments: DEFAULT_ENVIRONMENTS.iter().map(|e| e.to_string()).collect(),
            exclude_exceptions: default_excluded_kinds(),
            http_client: HttpClientConfig::default(),
            privacy: PrivacyConfig::default(),
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            retry: DEFAULT_RETRY,
            verify_tls: true,
        }
    }
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            sanitize_request_headers: DEFAULT_SENSITIVE_HEADERS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            sanitize_request_fields: DEFAULT_SENSITIVE_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

fn default_excluded_kinds() -> Vec<FaultKind> {
    DEFAULT_EXCLUDED_KINDS
        .iter()
        .filter_map(|k| FaultKind::new(k).ok())
        .collect()
}

// The API key never appears in debug output or logs.
impl fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("app_id", &self.app_id)
            .field("dashboard_url", &self.dashboard_url)
            .field("enabled", &self.enabled)
            .field("environments", &self.environments)
            .field("exclude_exceptions", &self.exclude_exceptions)
            .field("http_client", &self.http_client)
            .field("privacy", &self.privacy)
            .finish()
    }
}

/// Mask all but the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

impl TrackerConfig {
    /// Per-attempt HTTP timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_client.timeout)
    }

    /// Number of delivery attempts.
    pub fn retry_count(&self) -> u32 {
        self.http_client.retry
    }

    /// Whether faults raised in `environment` are reported.
    pub fn tracks_environment(&self, environment: &str) -> bool {
        self.environments.contains(environment)
    }

    /// A copy with the API key masked, suitable for display.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: mask_secret(&self.api_key),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Errors raised while reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl TrackerConfig {
    /// Load configuration from a YAML file at `path`.
    ///
    /// Missing sections and fields take their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Try to load from `path`; fall back to [`TrackerConfig::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Using default tracker configuration");
                Self::default()
            }
        }
    }

    /// Load from `path` (or defaults) and apply process environment overrides.
    pub fn load_from_env(path: &Path) -> Self {
        let mut config = Self::load_or_default(path);
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/errtrack/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("errtrack")
            .join("config.yaml")
    }

    /// Override fields from `ERROR_TRACKER_*` variables resolved by `lookup`.
    ///
    /// Empty values are ignored. An unparseable `ERROR_TRACKER_ENABLED` is
    /// logged and ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(app_id) = get(ENV_APP_ID) {
            self.app_id = app_id;
        }
        if let Some(url) = get(ENV_DASHBOARD_URL) {
            self.dashboard_url = url;
        }
        if let Some(raw) = get(ENV_ENABLED) {
            match parse_bool(&raw) {
                Some(enabled) => self.enabled = enabled,
                None => warn!(value = %raw, "Ignoring unparseable {}", ENV_ENABLED),
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"http_client.timeout"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl TrackerConfig {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.api_key.trim().is_empty() {
            errors.push(ValidationError {
                field: "api_key".into(),
                message: "must not be empty".into(),
            });
        }
        if self.app_id.trim().is_empty() {
            errors.push(ValidationError {
                field: "app_id".into(),
                message: "must not be empty".into(),
            });
        }

        let trimmed = self.dashboard_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            errors.push(ValidationError {
                field: "dashboard_url".into(),
                message: "must not be empty".into(),
            });
        } else {
            // A URL without a scheme is contacted over https
            let candidate = if trimmed.contains("://") {
                trimmed.to_string()
            } else {
                format!("https://{trimmed}")
            };
            match url::Url::parse(&candidate) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                Ok(url) => errors.push(ValidationError {
                    field: "dashboard_url".into(),
                    message: format!("unsupported scheme '{}'", url.scheme()),
                }),
                Err(e) => errors.push(ValidationError {
                    field: "dashboard_url".into(),
                    message: format!("invalid URL: {e}"),
                }),
            }
        }

        if self.http_client.timeout == 0 {
            errors.push(ValidationError {
                field: "http_client.timeout".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self
            .privacy
            .sanitize_request_headers
            .iter()
            .any(|h| h.trim().is_empty())
        {
            errors.push(ValidationError {
                field: "privacy.sanitize_request_headers".into(),
                message: "must not contain empty names".into(),
            });
        }
        // An empty substring would match every field name.
        if self
            .privacy
            .sanitize_request_fields
            .iter()
            .any(|f| f.is_empty())
        {
            errors.push(ValidationError {
                field: "privacy.sanitize_request_fields".into(),
                message: "must not contain empty names".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`TrackerConfig`] programmatically.
///
/// Starts from [`TrackerConfig::default`] and allows overriding individual fields.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: TrackerConfig,
}

impl ConfigBuilder {
    /// Create a new builder initialised with default values.
    pub fn new() -> Self {
        Self {
            config: TrackerConfig::default(),
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.app_id = app_id.into();
        self
    }

    pub fn dashboard_url(mut self, url: impl Into<String>) -> Self {
        self.config.dashboard_url = url.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Replace the tracked environment list.
    pub fn environments<I, S>(mut self, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.environments = environments.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the excluded fault kinds.
    pub fn exclude(mut self, kinds: Vec<FaultKind>) -> Self {
        self.config.exclude_exceptions = kinds;
        self
    }

    pub fn timeout_secs(mut self, seconds: u64) -> Self {
        self.config.http_client.timeout = seconds;
        self
    }

    pub fn retry(mut self, attempts: u32) -> Self {
        self.config.http_client.retry = attempts;
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.http_client.verify_tls = verify;
        self
    }

    pub fn sensitive_headers(mut self, headers: Vec<String>) -> Self {
        self.config.privacy.sanitize_request_headers = headers;
        self
    }

    pub fn sensitive_fields(mut self, fields: Vec<String>) -> Self {
        self.config.privacy.sanitize_request_fields = fields;
        self
    }

    /// Consume the builder and return the final [`TrackerConfig`].
    pub fn build(self) -> TrackerConfig {
        self.config
    }

    /// Consume the builder, validate, and return the config or a list of errors.
    pub fn build_validated(self) -> Result<TrackerConfig, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
