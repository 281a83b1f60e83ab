//! Configuration types for arscan.
//!
//! Settings come from an optional TOML file:
//!
//! - [`Config`] - Root configuration struct
//! - [`GatewayConfig`] - Gateway URL and request timeout
//! - [`QueryConfig`] - Pagination settings
//! - [`VerifyConfigFile`] - Retry and dispatch tuning for verification
//!
//! Every field has a default, so an absent or empty file is valid.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::constants;
use crate::reliability::RetryPolicy;
use crate::verify::VerifyConfig;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// arscan.toml configuration structure.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub verify: VerifyConfigFile,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VerifyConfigFile {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    #[serde(default = "default_dispatch_delay_ms")]
    pub dispatch_delay_ms: u64,
}

impl Default for VerifyConfigFile {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            dispatch_delay_ms: default_dispatch_delay_ms(),
        }
    }
}

fn default_gateway_url() -> String {
    constants::DEFAULT_GATEWAY_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    constants::DEFAULT_TIMEOUT_SECS
}

fn default_page_size() -> usize {
    constants::DEFAULT_PAGE_SIZE
}

fn default_max_attempts() -> u32 {
    constants::DEFAULT_MAX_ATTEMPTS
}

fn default_retry_initial_delay_ms() -> u64 {
    constants::DEFAULT_RETRY_INITIAL_DELAY_MS
}

fn default_retry_max_delay_ms() -> u64 {
    constants::DEFAULT_RETRY_MAX_DELAY_MS
}

fn default_dispatch_delay_ms() -> u64 {
    constants::DEFAULT_DISPATCH_DELAY_MS
}

impl Config {
    /// Default location: `<config_dir>/arscan/arscan.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("arscan").join(constants::CONFIG_FILE_NAME))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present, otherwise built-in defaults. The gateway URL from
    /// `ARSCAN_GATEWAY` takes precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::load_from(&path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                },
            },
        };
        config.apply_env(std::env::var(constants::GATEWAY_ENV_VAR).ok());
        Ok(config)
    }

    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types or unknown names
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply the gateway override, ignoring blank values.
    pub fn apply_env(&mut self, gateway: Option<String>) {
        if let Some(url) = gateway.filter(|u| !u.trim().is_empty()) {
            self.gateway.url = url.trim().to_string();
        }
    }

    /// Validate configuration with comprehensive checks.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found:
    /// - Gateway URL that does not parse or is not http(s)
    /// - Zero timeout
    /// - Page size outside 1-100
    /// - Zero attempts or an initial delay above the maximum delay
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match url::Url::parse(&self.gateway.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.scheme() == "http" {
                    warnings.push(format!(
                        "gateway.url '{}' is not encrypted\n  \
                         Recommendation: use an https gateway",
                        self.gateway.url
                    ));
                }
            },
            Ok(url) => errors.push(format!(
                "gateway.url must use http or https (got scheme '{}')",
                url.scheme()
            )),
            Err(e) => errors.push(format!("gateway.url '{}' is invalid: {e}", self.gateway.url)),
        }

        if self.gateway.timeout_secs == 0 {
            errors.push("gateway.timeout_secs cannot be 0".to_string());
        }

        let page_size = self.query.page_size;
        if page_size == 0 || page_size > constants::MAX_PAGE_SIZE {
            errors.push(format!(
                "query.page_size must be between 1 and {} (got {page_size})",
                constants::MAX_PAGE_SIZE
            ));
        }

        let verify = &self.verify;
        if verify.max_attempts == 0 {
            errors.push("verify.max_attempts must be at least 1".to_string());
        }
        if verify.retry_initial_delay_ms > verify.retry_max_delay_ms {
            errors.push(format!(
                "verify.retry_initial_delay_ms ({}) is above verify.retry_max_delay_ms ({})",
                verify.retry_initial_delay_ms, verify.retry_max_delay_ms
            ));
        }
        if verify.dispatch_delay_ms == 0 {
            warnings.push(
                "verify.dispatch_delay_ms is 0\n  \
                 All verification tasks will hit the gateway at once"
                    .to_string(),
            );
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.timeout_secs)
    }

    /// Retry policy shared by page transport, metadata fetches and polling.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.verify.max_attempts)
            .with_initial_delay(Duration::from_millis(self.verify.retry_initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.verify.retry_max_delay_ms))
    }

    pub fn verify_config(&self) -> VerifyConfig {
        VerifyConfig {
            retry: self.retry_policy(),
            dispatch_delay: Duration::from_millis(self.verify.dispatch_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.gateway.url, constants::DEFAULT_GATEWAY_URL);
        assert_eq!(config.query.page_size, constants::DEFAULT_PAGE_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[gateway]
url = "https://gateway.example"
timeout_secs = 10

[query]
page_size = 50

[verify]
max_attempts = 3
retry_initial_delay_ms = 100
retry_max_delay_ms = 1000
dispatch_delay_ms = 20
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gateway.url, "https://gateway.example");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.query.page_size, 50);

        let verify = config.verify_config();
        assert_eq!(verify.retry.max_attempts, 3);
        assert_eq!(verify.retry.initial_delay, Duration::from_millis(100));
        assert_eq!(verify.dispatch_delay, Duration::from_millis(20));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[gateway]\nport = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env(Some("  ".to_string()));
        assert_eq!(config.gateway.url, constants::DEFAULT_GATEWAY_URL);

        config.apply_env(Some("http://localhost:1984".to_string()));
        assert_eq!(config.gateway.url, "http://localhost:1984");
    }

    #[test]
    fn test_validate_http_warns() {
        let mut config = Config::default();
        config.gateway.url = "http://localhost:1984".to_string();
        let result = config.validate().unwrap();
        assert!(result.has_warnings());
    }

    #[test]
    fn test_validate_multiple_errors() {
        let mut config = Config::default();
        config.gateway.url = "ftp://gateway".to_string();
        config.gateway.timeout_secs = 0;
        config.query.page_size = 101;
        config.verify.max_attempts = 0;
        config.verify.retry_initial_delay_ms = 10_000;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("gateway.url"));
        assert!(err.contains("timeout_secs"));
        assert!(err.contains("page_size"));
        assert!(err.contains("max_attempts"));
        assert!(err.contains("retry_initial_delay_ms"));
    }

    #[test]
    fn test_validate_unparseable_url() {
        let mut config = Config::default();
        config.gateway.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[query]\npage_size = 25").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.query.page_size, 25);
        assert_eq!(config.gateway.timeout_secs, constants::DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arscan.toml");
        std::fs::write(&path, "[query\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
