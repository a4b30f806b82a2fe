//! Application settings and configuration management

use crate::backend::traits::BackendKind;
use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Environment variable holding the Gemini API key when not set in config
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub gemini: GeminiConfig,
    pub resolver: ResolverConfig,
    /// Ranked backends; order within a kind is fallback order
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    10000
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Gemini provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout() -> u64 {
    60000
}

/// Fallback resolver configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Deadline for a whole resolve call in milliseconds, 0 disables it
    #[serde(default)]
    pub timeout_ms: u64,
}

/// Backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub identifier: String,
    pub kind: BackendKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_str().ok_or_else(|| {
            AppError::Config(config::ConfigError::Message(
                "Configuration path is not valid UTF-8".to_string(),
            ))
        })?;

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .set_default("gemini.base_url", default_gemini_base_url())?
            .set_default("gemini.timeout_ms", default_timeout() as i64)?
            .set_default("resolver.timeout_ms", 0)?
            // Load from configuration file
            .add_source(File::with_name(path).required(false))
            // Override with environment variables (GEN_GATEWAY__SECTION__KEY)
            .add_source(
                Environment::with_prefix("GEN_GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        if settings.gemini.api_key.as_deref().map_or(true, str::is_empty) {
            settings.gemini.api_key = std::env::var(GEMINI_API_KEY_ENV)
                .ok()
                .filter(|key| !key.is_empty());
        }

        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Server port cannot be 0".to_string(),
            )));
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(AppError::Config(config::ConfigError::Message(format!(
                "Invalid log format '{}'. Must be 'json' or 'pretty'",
                self.logging.format
            ))));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.identifier.trim().is_empty() {
                return Err(AppError::Config(config::ConfigError::Message(
                    "Backend identifier cannot be empty".to_string(),
                )));
            }
            if !seen.insert((backend.kind, backend.identifier.as_str())) {
                return Err(AppError::Config(config::ConfigError::Message(format!(
                    "Backend '{}' is listed twice for {} generation",
                    backend.identifier, backend.kind
                ))));
            }
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
            gemini: GeminiConfig {
                api_key: None,
                base_url: default_gemini_base_url(),
                timeout_ms: default_timeout(),
            },
            resolver: ResolverConfig { timeout_ms: 0 },
            backends: vec![],
        }
    }
}
