//! TOML configuration.
//!
//! Every section is optional; an empty file yields the same values as
//! [`Config::minimal`]. API keys never live in the file, only the name of the
//! environment variable that holds them.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub report_log: ReportLogConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportLogConfig {
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
}

impl Default for ReportLogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("./data/reports.md")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default = "default_qualifier")]
    pub qualifier: String,
    #[serde(default = "default_domain_suffix")]
    pub domain_suffix: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Overrides the provider's default key variable (`EXA_API_KEY`, `GOOGLE_API_KEY`).
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Programmable Search Engine ID, required for `provider = "google"`.
    #[serde(default)]
    pub google_cx: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            qualifier: default_qualifier(),
            domain_suffix: default_domain_suffix(),
            max_results: default_max_results(),
            timeout_secs: None,
            api_key_env: None,
            google_cx: None,
        }
    }
}

impl SearchConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_disabled() -> String {
    "disabled".to_string()
}
fn default_qualifier() -> String {
    "IR 資料 filetype:pdf".to_string()
}
fn default_domain_suffix() -> String {
    "co.jp".to_string()
}
fn default_max_results() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FetchConfig {
    /// No timeout when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl FetchConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Characters of extracted text embedded in each prompt; full text when absent.
    #[serde(default)]
    pub truncate_chars: Option<usize>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_completion_provider(),
            model: default_model(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_secs: None,
            truncate_chars: None,
        }
    }
}

impl CompletionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_completion_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_include_financial")]
    pub include_financial: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_financial: default_include_financial(),
        }
    }
}

fn default_include_financial() -> bool {
    true
}

impl Config {
    /// All-defaults configuration, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Search
    match config.search.provider.as_str() {
        "disabled" | "exa" => {}
        "google" => {
            if config.search.google_cx.as_deref().unwrap_or("").is_empty() {
                bail!("search.google_cx must be set when provider is 'google'");
            }
        }
        other => bail!(
            "Unknown search provider: '{}'. Must be disabled, exa, or google.",
            other
        ),
    }
    if config.search.max_results == 0 {
        bail!("search.max_results must be >= 1");
    }

    // Completion
    match config.completion.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown completion provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.completion.is_enabled() && config.completion.model.trim().is_empty() {
        bail!(
            "completion.model must be specified when provider is '{}'",
            config.completion.provider
        );
    }
    let t = config.completion.temperature;
    if !(t > 0.0 && t <= 2.0) {
        bail!("completion.temperature must be in (0.0, 2.0], got {}", t);
    }
    if config.completion.truncate_chars == Some(0) {
        bail!("completion.truncate_chars must be >= 1 when set");
    }

    Ok(())
}
