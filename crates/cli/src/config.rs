//! CLI configuration: a TOML file plus environment overrides for secrets.

use std::path::{Path, PathBuf};

use anyhow::Context;
use connector::ConnectorError;
use github::GithubClientConfig;
use serde::Deserialize;

/// Used when `--config` is not given. A missing file at this path is not an
/// error; every setting then comes from defaults and the environment.
pub const DEFAULT_CONFIG_PATH: &str = ".code-scanning/config.toml";

pub const ENV_APP_TOKEN: &str = "GITHUB_APP_TOKEN";
pub const ENV_API_URL: &str = "GITHUB_API_URL";

/// Top-level configuration file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub github: GithubClientConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub log_level: String,
    /// OTLP gRPC endpoint. Spans are only exported when this is set.
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            otlp_endpoint: None,
            service_name: "code-scanning-connector".to_string(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from `path` (or [`DEFAULT_CONFIG_PATH`]) and applies
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Overrides file values with non-empty environment values.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = lookup(ENV_APP_TOKEN) {
            self.github.app_token = token;
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.github.api_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConnectorError> {
        let invalid = |message: String| Err(ConnectorError::Configuration { message });
        if self.github.app_token.trim().is_empty() {
            return invalid(format!(
                "no GitHub App token configured; set github.app_token or {ENV_APP_TOKEN}"
            ));
        }
        if self.github.api_url.trim().is_empty() {
            return invalid("github.api_url must not be empty".to_string());
        }
        if self.github.page_size == 0 {
            return invalid("github.page_size must be at least 1".to_string());
        }
        Ok(())
    }
}
