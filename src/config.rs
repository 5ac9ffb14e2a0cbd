//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.schemelens.toml` files, and resolving the API key.

use crate::error::{DashboardError, MissingCredentialError};
use crate::models::InvalidMetricPolicy;
use crate::review::ReviewConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".schemelens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "scheme_dashboard.md".to_string()
}

/// Input workbook settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Worksheet to read; the first sheet when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,

    /// What to do with missing or non-numeric metrics.
    #[serde(default)]
    pub on_invalid: InvalidMetricPolicy,
}

/// Text-generation model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Base URL of the chat-completions API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens in response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_url: default_api_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    1800
}

fn default_timeout() -> u64 {
    120
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl From<&ModelConfig> for ReviewConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            api_url: config.api_url.clone(),
            model_name: config.name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_seconds: config.timeout_seconds,
        }
    }
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rows shown in the data preview table.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Width of the longest bar in text charts.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,

    /// Unit label for budget amounts.
    #[serde(default = "default_currency_label")]
    pub currency_label: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            preview_rows: default_preview_rows(),
            bar_width: default_bar_width(),
            currency_label: default_currency_label(),
        }
    }
}

fn default_preview_rows() -> usize {
    20
}

fn default_bar_width() -> usize {
    30
}

fn default_currency_label() -> String {
    "₹ Cr".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.schemelens.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref api_url) = args.api_url {
            self.model.api_url = api_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(ref sheet) = args.sheet {
            self.input.sheet = Some(sheet.clone());
        }
        if let Some(policy) = args.on_invalid {
            self.input.on_invalid = policy;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// A secret API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey(***)")
    }
}

/// Read the API key from the environment.
///
/// Call `dotenvy::dotenv()` first to pick up a `.env` file.
pub fn resolve_api_key(env_var: &str) -> Result<ApiKey, DashboardError> {
    match std::env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(ApiKey::new(key.trim())),
        _ => Err(MissingCredentialError {
            env_var: env_var.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.max_tokens, 1800);
        assert_eq!(config.input.on_invalid, InvalidMetricPolicy::Fail);
        assert_eq!(config.report.preview_rows, 20);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "pune_review.md"
verbose = true

[input]
sheet = "FY24"
on_invalid = "exclude"

[model]
name = "gpt-4o"
timeout_seconds = 60

[report]
currency_label = "Rs Cr"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "pune_review.md");
        assert!(config.general.verbose);
        assert_eq!(config.input.sheet.as_deref(), Some("FY24"));
        assert_eq!(config.input.on_invalid, InvalidMetricPolicy::Exclude);
        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.model.timeout_seconds, 60);
        assert_eq!(config.model.max_tokens, 1800);
        assert_eq!(config.report.currency_label, "Rs Cr");
        assert_eq!(config.report.bar_width, 30);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[input]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_load_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(temp_dir.path()).unwrap().is_none());

        std::fs::write(
            temp_dir.path().join(CONFIG_FILE),
            "[model]\nname = \"local-model\"\n",
        )
        .unwrap();
        let config = Config::load_from_dir(temp_dir.path()).unwrap().unwrap();
        assert_eq!(config.model.name, "local-model");

        std::fs::write(temp_dir.path().join(CONFIG_FILE), "[model\n").unwrap();
        assert!(Config::load_from_dir(temp_dir.path()).is_err());
    }

    #[test]
    fn test_config_verbose_raises_log_level() {
        use clap::Parser;

        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args = crate::cli::Args::try_parse_from(["scheme-lens", "--input", "schemes.xlsx"])
            .unwrap();
        config.merge_with_args(&args);

        assert!(config.general.verbose);
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);

        let quiet = crate::cli::Args::try_parse_from([
            "scheme-lens",
            "--input",
            "schemes.xlsx",
            "--quiet",
        ])
        .unwrap();
        assert_eq!(quiet.log_level(config.general.verbose), tracing::Level::ERROR);
    }

    #[test]
    fn test_review_config_from_model() {
        let review = ReviewConfig::from(&ModelConfig::default());
        assert_eq!(review.model_name, "gpt-4o-mini");
        assert_eq!(review.timeout_seconds, 120);
    }

    #[test]
    fn test_resolve_api_key() {
        let var = "SCHEMELENS_TEST_KEY_RESOLVE";
        std::env::remove_var(var);
        let err = resolve_api_key(var).unwrap_err();
        assert!(matches!(err, DashboardError::MissingCredential(_)));
        assert!(err.to_string().contains(var));

        std::env::set_var(var, "  sk-test  ");
        let key = resolve_api_key(var).unwrap();
        assert_eq!(key.expose(), "sk-test");
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
        std::env::remove_var(var);
    }
}
