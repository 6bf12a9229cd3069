//! Cipher Scribe Configuration
//!
//! Shared configuration crate for the node and the CLI.
//!
//! Handles loading configuration from:
//! 1. SCRIBE_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.cipher-scribe/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<ScribeConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".cipher-scribe";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080";
const DEFAULT_DB_PATH: &str = "./scribe-db";
const DEFAULT_OWNER: &str = "deployer";
const DEFAULT_EVENT_CAPACITY: usize = 256;
const DEFAULT_COPROCESSOR_SEED: &str = "cipher-scribe-dev";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScribeConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ledger: LedgerTomlConfig,
    #[serde(default)]
    pub disclosure: DisclosureTomlConfig,
    #[serde(default)]
    pub relayer: RelayerConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind host for the node
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL clients use to reach the node
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            endpoint: DEFAULT_ENDPOINT.into(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Keep all ledger state in memory (nothing survives a restart)
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.into(),
            in_memory: false,
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

/// Ledger configuration (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTomlConfig {
    /// Initial owner, as a label or a 64-char hex principal
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Buffered notifications per subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for LedgerTomlConfig {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.into(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

fn default_owner() -> String {
    DEFAULT_OWNER.into()
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

/// Who may request a disclosure
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudienceToml {
    #[default]
    Anyone,
    Owner,
}

impl AudienceToml {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "anyone" => Some(Self::Anyone),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }
}

/// Disclosure policy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisclosureTomlConfig {
    #[serde(default)]
    pub final_score: AudienceToml,
    #[serde(default)]
    pub share_total: AudienceToml,
}

/// Relayer / coprocessor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerConfig {
    /// Key seed for the mock coprocessor
    #[serde(default = "default_coprocessor_seed")]
    pub coprocessor_seed: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            coprocessor_seed: DEFAULT_COPROCESSOR_SEED.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_ms: DEFAULT_RETRY_BASE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_coprocessor_seed() -> String {
    DEFAULT_COPROCESSOR_SEED.into()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_base_ms() -> u64 {
    DEFAULT_RETRY_BASE_MS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Feature flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Enable dev mode (diagnostic endpoints)
    #[serde(default)]
    pub dev_mode: bool,
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

/// Check if env var is set to a truthy value ("1" or "true")
fn env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn env_audience(key: &str, field: &mut AudienceToml) {
    if let Some(audience) = env::var(key).ok().as_deref().and_then(AudienceToml::parse) {
        *field = audience;
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl ScribeConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check SCRIBE_CONFIG env var
        if let Ok(path) = env::var("SCRIBE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.cipher-scribe/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Database
        env_string("SCRIBE_DB_PATH", &mut self.database.path);
        if let Some(v) = env_bool("SCRIBE_IN_MEMORY") {
            self.database.in_memory = v;
        }

        // API
        env_string("SCRIBE_API_HOST", &mut self.api.host);
        env_parse("SCRIBE_API_PORT", &mut self.api.port);
        env_string("SCRIBE_ENDPOINT", &mut self.api.endpoint);

        // Ledger
        env_string("SCRIBE_OWNER", &mut self.ledger.owner);
        env_parse("SCRIBE_EVENT_CAPACITY", &mut self.ledger.event_capacity);

        // Disclosure
        env_audience(
            "SCRIBE_FINAL_SCORE_AUDIENCE",
            &mut self.disclosure.final_score,
        );
        env_audience(
            "SCRIBE_SHARE_TOTAL_AUDIENCE",
            &mut self.disclosure.share_total,
        );

        // Relayer
        env_string(
            "SCRIBE_COPROCESSOR_SEED",
            &mut self.relayer.coprocessor_seed,
        );
        env_parse("SCRIBE_MAX_RETRIES", &mut self.relayer.max_retries);
        env_parse("SCRIBE_RETRY_BASE_MS", &mut self.relayer.retry_base_ms);
        env_parse(
            "SCRIBE_REQUEST_TIMEOUT_SECS",
            &mut self.relayer.request_timeout_secs,
        );

        // Features
        if let Some(v) = env_bool("DEV_MODE") {
            self.features.dev_mode = v;
        }
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.features.dev_mode = true;
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static ScribeConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: ScribeConfig) -> Result<(), ScribeConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
