use crate::error::{GhorgsError, Result};
use crate::fetch::GITHUB_GRAPHQL_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "ghorgs.yaml";

/// Settings read from `ghorgs.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub organization: String,
    #[serde(default = "default_users_csv")]
    pub users_csv: PathBuf,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Where and how membership pages are fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,
    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            url: default_api_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the bearer token from the configured environment variable.
    pub fn token(&self) -> Result<String> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(GhorgsError::Config(format!(
                "no API token: set {}",
                self.token_env
            ))),
        }
    }
}

/// How the users report is shaped when the command line does not say
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_users_csv() -> PathBuf {
    PathBuf::from("users.csv")
}

fn default_api_url() -> String {
    GITHUB_GRAPHQL_URL.to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Parse a config file
pub fn parse_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GhorgsError::Config(format!("Failed to read {}: {e}", path.display()))
    })?;
    parse_config_str(&content)
}

/// Parse a config YAML string
pub fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(content)?;
    if config.organization.trim().is_empty() {
        return Err(GhorgsError::Config("organization must not be empty".into()));
    }
    Ok(config)
}
