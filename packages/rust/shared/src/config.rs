//! Application configuration for LeadEnrich.
//!
//! User config lives at `~/.leadenrich/leadenrich.toml`.
//! API keys are never stored in the file, only the names of the env vars
//! holding them. CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LeadEnrichError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadenrich.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadenrich";

// ---------------------------------------------------------------------------
// Config structs (matching leadenrich.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter (LLM) settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Google Custom Search settings.
    #[serde(default)]
    pub google: GoogleConfig,

    /// FullEnrich (name-based phone vendor) settings.
    #[serde(default)]
    pub fullenrich: FullEnrichConfig,

    /// Kaspr (LinkedIn-based phone vendor) settings.
    #[serde(default)]
    pub kaspr: KasprConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,

    /// Upper bound for a single collaborator step in the pipeline.
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,

    /// Maximum candidates kept before validation.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Location of the phone statistics file. `~` expands to the home directory.
    #[serde(default = "default_stats_file")]
    pub stats_file: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            api_timeout_secs: default_api_timeout(),
            step_timeout_secs: default_step_timeout(),
            max_candidates: default_max_candidates(),
            stats_file: default_stats_file(),
        }
    }
}

fn default_api_timeout() -> u64 {
    30
}
fn default_step_timeout() -> u64 {
    45
}
fn default_max_candidates() -> usize {
    3
}
fn default_stats_file() -> String {
    "~/.leadenrich/phone_stats.json".into()
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_openrouter_key_env")]
    pub api_key_env: String,

    /// API base URL.
    #[serde(default = "default_openrouter_url")]
    pub base_url: String,

    /// Cheap model for simple yes/no validations.
    #[serde(default = "default_fast_model")]
    pub fast_model: String,

    /// Model for extraction and ranking.
    #[serde(default = "default_balanced_model")]
    pub balanced_model: String,

    /// Model for long-form research briefs.
    #[serde(default = "default_smart_model")]
    pub smart_model: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openrouter_key_env(),
            base_url: default_openrouter_url(),
            fast_model: default_fast_model(),
            balanced_model: default_balanced_model(),
            smart_model: default_smart_model(),
        }
    }
}

fn default_openrouter_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_fast_model() -> String {
    "google/gemini-2.5-flash".into()
}
fn default_balanced_model() -> String {
    "anthropic/claude-haiku-4.5".into()
}
fn default_smart_model() -> String {
    "anthropic/claude-sonnet-4.5".into()
}

/// `[google]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// Env var holding the Custom Search API key.
    #[serde(default = "default_google_key_env")]
    pub api_key_env: String,

    /// Env var holding the Custom Search engine id (`cx`).
    #[serde(default = "default_google_cse_env")]
    pub cse_id_env: String,

    /// API endpoint.
    #[serde(default = "default_google_url")]
    pub base_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_google_key_env(),
            cse_id_env: default_google_cse_env(),
            base_url: default_google_url(),
        }
    }
}

fn default_google_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_google_cse_env() -> String {
    "GOOGLE_CSE_ID".into()
}
fn default_google_url() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}

/// `[fullenrich]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullEnrichConfig {
    /// Env var holding the API key.
    #[serde(default = "default_fullenrich_key_env")]
    pub api_key_env: String,

    /// API base URL.
    #[serde(default = "default_fullenrich_url")]
    pub base_url: String,

    /// Seconds between status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum number of status polls before giving up.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

impl Default for FullEnrichConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_fullenrich_key_env(),
            base_url: default_fullenrich_url(),
            poll_interval_secs: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

fn default_fullenrich_key_env() -> String {
    "FULLENRICH_API_KEY".into()
}
fn default_fullenrich_url() -> String {
    "https://app.fullenrich.com/api/v1".into()
}
fn default_poll_interval() -> u64 {
    2
}
fn default_max_poll_attempts() -> u32 {
    30
}

/// `[kaspr]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KasprConfig {
    /// Env var holding the API key.
    #[serde(default = "default_kaspr_key_env")]
    pub api_key_env: String,

    /// API base URL.
    #[serde(default = "default_kaspr_url")]
    pub base_url: String,
}

impl Default for KasprConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_kaspr_key_env(),
            base_url: default_kaspr_url(),
        }
    }
}

fn default_kaspr_key_env() -> String {
    "KASPR_API_KEY".into()
}
fn default_kaspr_url() -> String {
    "https://api.developers.kaspr.io".into()
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, derived from the config file)
// ---------------------------------------------------------------------------

/// Hard ceiling on candidates handed to validation, whatever the config says.
pub const MAX_VALIDATION_CANDIDATES: usize = 3;

/// Runtime settings for one enrichment pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum candidates kept before validation, at most
    /// [`MAX_VALIDATION_CANDIDATES`].
    pub max_candidates: usize,
    /// Time budget for one collaborator call.
    pub step_timeout: Duration,
    /// Time budget for a FullEnrich lookup, which polls internally.
    pub name_enricher_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let api = config.defaults.api_timeout_secs;
        let polling = config.fullenrich.poll_interval_secs
            * u64::from(config.fullenrich.max_poll_attempts);
        Self {
            max_candidates: config
                .defaults
                .max_candidates
                .clamp(1, MAX_VALIDATION_CANDIDATES),
            step_timeout: Duration::from_secs(config.defaults.step_timeout_secs),
            // start request + polling window + one last poll
            name_enricher_timeout: Duration::from_secs(polling + 2 * api),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadenrich/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadEnrichError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadenrich/leadenrich.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadEnrichError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        LeadEnrichError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<()> {
    let max = config.defaults.max_candidates;
    if max == 0 {
        return Err(LeadEnrichError::config("defaults.max_candidates must be at least 1"));
    }
    if max > MAX_VALIDATION_CANDIDATES {
        tracing::warn!(
            max_candidates = max,
            limit = MAX_VALIDATION_CANDIDATES,
            "max_candidates above limit, clamping"
        );
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadEnrichError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadEnrichError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadEnrichError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a secret from the named env var. Empty values count as missing.
pub fn resolve_secret(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Some(val.trim().to_string()),
        _ => None,
    }
}

/// Like [`resolve_secret`] but fails with a config error naming the service.
pub fn require_secret(var_name: &str, service: &str) -> Result<String> {
    resolve_secret(var_name).ok_or_else(|| {
        LeadEnrichError::config(format!(
            "{service} API key not found. Set the {var_name} environment variable."
        ))
    })
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| LeadEnrichError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
