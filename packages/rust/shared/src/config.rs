//! Application configuration for Placebook.
//!
//! User config lives at `~/.placebook/placebook.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! Secrets are never stored in the config file. Each external service names
//! its sources (an env var, optionally a key file) and the loader resolves
//! them through [`resolve_secret`] — an ordered list tried in priority
//! order, returning the first present value.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PlacebookError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "placebook.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".placebook";

// ---------------------------------------------------------------------------
// Config structs (matching placebook.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Completion model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Places lookup API settings.
    #[serde(default)]
    pub places: PlacesConfig,

    /// Document source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Catalog storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the document endpoint. Empty means documents are read
    /// from local paths.
    #[serde(default)]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_source_timeout(),
        }
    }
}

fn default_source_timeout() -> u64 {
    30
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Storage key the latest catalog is written under.
    #[serde(default = "default_catalog_key")]
    pub catalog_key: String,

    /// Free-text location disambiguator passed verbatim into prompts and
    /// lookup queries (e.g. "Door County, Wisconsin").
    #[serde(default)]
    pub location_context: String,

    /// Version stamp written into `enrichmentStatus`; bumping it makes every
    /// previously enriched place stale on the next run.
    #[serde(default = "default_enrichment_version")]
    pub enrichment_version: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            catalog_key: default_catalog_key(),
            location_context: String::new(),
            enrichment_version: default_enrichment_version(),
        }
    }
}

fn default_catalog_key() -> String {
    "catalog.json".into()
}
fn default_enrichment_version() -> String {
    "2.0".into()
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_model_key_env")]
    pub api_key_env: String,

    /// Optional key file consulted after the env var.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<PathBuf>,

    /// OpenAI-compatible endpoint base URL.
    #[serde(default = "default_model_base_url")]
    pub base_url: String,

    /// Model identifier for extraction and tag synthesis.
    #[serde(default = "default_model_id")]
    pub model: String,

    /// Output token ceiling. Sized for full-document extraction; the client
    /// fails loudly when a response is cut off at this limit.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_model_key_env(),
            api_key_file: None,
            base_url: default_model_base_url(),
            model: default_model_id(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_model_timeout(),
        }
    }
}

fn default_model_key_env() -> String {
    "PLACEBOOK_MODEL_API_KEY".into()
}
fn default_model_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model_id() -> String {
    "gpt-4o-mini".into()
}
fn default_max_output_tokens() -> u32 {
    16_384
}
fn default_model_timeout() -> u64 {
    120
}

/// `[places]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// Name of the env var holding the lookup API key.
    #[serde(default = "default_places_key_env")]
    pub api_key_env: String,

    /// Optional key file consulted after the env var.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<PathBuf>,

    /// Places API base URL.
    #[serde(default = "default_places_base_url")]
    pub base_url: String,

    /// Fixed delay between consecutive outbound lookup calls.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Maximum search results requested per query.
    #[serde(default = "default_max_results")]
    pub max_results: u8,

    /// Request timeout in seconds.
    #[serde(default = "default_places_timeout")]
    pub timeout_secs: u64,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_places_key_env(),
            api_key_file: None,
            base_url: default_places_base_url(),
            rate_limit_ms: default_rate_limit(),
            max_results: default_max_results(),
            timeout_secs: default_places_timeout(),
        }
    }
}

fn default_places_key_env() -> String {
    "PLACEBOOK_PLACES_API_KEY".into()
}
fn default_places_base_url() -> String {
    "https://places.googleapis.com/v1".into()
}
fn default_rate_limit() -> u64 {
    200
}
fn default_max_results() -> u8 {
    5
}
fn default_places_timeout() -> u64 {
    10
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend: "local" or "http".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Root directory for the local backend.
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Base URL for the http backend.
    #[serde(default)]
    pub base_url: String,

    /// Name of the env var holding the http backend bearer token.
    #[serde(default = "default_storage_token_env")]
    pub token_env: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: default_storage_root(),
            base_url: String::new(),
            token_env: default_storage_token_env(),
        }
    }
}

fn default_backend() -> String {
    "local".into()
}
fn default_storage_root() -> String {
    "~/placebook-data".into()
}
fn default_storage_token_env() -> String {
    "PLACEBOOK_STORAGE_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Secret resolution
// ---------------------------------------------------------------------------

/// One way to obtain a secret.
#[derive(Debug, Clone)]
pub enum SecretSource {
    /// Read from an environment variable.
    Env(String),
    /// Read (and trim) the contents of a file.
    File(PathBuf),
}

/// Try each source in order and return the first non-empty value.
pub fn resolve_secret(sources: &[SecretSource]) -> Option<String> {
    for source in sources {
        match source {
            SecretSource::Env(name) => {
                if let Ok(value) = std::env::var(name) {
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
            SecretSource::File(path) => {
                if let Ok(contents) = std::fs::read_to_string(path) {
                    let trimmed = contents.trim();
                    if !trimmed.is_empty() {
                        return Some(trimmed.to_string());
                    }
                }
            }
        }
    }
    None
}

impl ModelConfig {
    /// Ordered secret sources for the model API key.
    pub fn key_sources(&self) -> Vec<SecretSource> {
        let mut sources = vec![SecretSource::Env(self.api_key_env.clone())];
        if let Some(path) = &self.api_key_file {
            sources.push(SecretSource::File(path.clone()));
        }
        sources
    }

    /// Resolve the API key or fail with a config error naming the sources.
    pub fn resolve_key(&self) -> Result<String> {
        resolve_secret(&self.key_sources()).ok_or_else(|| {
            PlacebookError::config(format!(
                "model API key not found. Set the {} environment variable.",
                self.api_key_env
            ))
        })
    }
}

impl PlacesConfig {
    /// Ordered secret sources for the places API key.
    pub fn key_sources(&self) -> Vec<SecretSource> {
        let mut sources = vec![SecretSource::Env(self.api_key_env.clone())];
        if let Some(path) = &self.api_key_file {
            sources.push(SecretSource::File(path.clone()));
        }
        sources
    }

    /// Resolve the API key or fail with a config error naming the sources.
    pub fn resolve_key(&self) -> Result<String> {
        resolve_secret(&self.key_sources()).ok_or_else(|| {
            PlacebookError::config(format!(
                "places API key not found. Set the {} environment variable.",
                self.api_key_env
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.placebook/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PlacebookError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.placebook/placebook.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PlacebookError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PlacebookError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PlacebookError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PlacebookError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PlacebookError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
