//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `AUDITED_`, nesting separator: `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/audited-repository/{service_name}/config.toml
//! 4. System directory: /etc/audited-repository/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "billing"
//! log_level = "debug"
//!
//! [repository]
//! case_sensitive_filters = false
//! max_page_size = 200
//! ```
//!
//! `AUDITED_REPOSITORY__MAX_PAGE_SIZE=100` overrides the file value.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::repository::RepositoryOptions;

const APP_DIR: &str = "audited-repository";
const ENV_PREFIX: &str = "AUDITED_";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Repository engine configuration
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Repository engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Whether paged-query `filters` compare case-sensitively
    #[serde(default = "default_true")]
    pub case_sensitive_filters: bool,

    /// Largest accepted page size (unbounded when absent)
    #[serde(default)]
    pub max_page_size: Option<u32>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            case_sensitive_filters: default_true(),
            max_page_size: None,
        }
    }
}

impl From<RepositoryConfig> for RepositoryOptions {
    fn from(config: RepositoryConfig) -> Self {
        Self {
            case_sensitive_filters: config.case_sensitive_filters,
            max_page_size: config.max_page_size,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration for the current executable's service name
    ///
    /// # Errors
    ///
    /// Returns an error when a source is malformed or a value has the wrong type.
    pub fn load() -> Result<Self> {
        // Infer service name from binary name or use default
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| APP_DIR.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a named service from every standard location
    ///
    /// # Errors
    ///
    /// Returns an error when a source is malformed or a value has the wrong type.
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::named(service_name)));

        // Lowest priority first so higher priority files override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a single file plus environment overrides
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is malformed or a value has the wrong type.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Options for [`GenericRepository::bind`](crate::repository::GenericRepository::bind)
    pub fn repository_options(&self) -> RepositoryOptions {
        self.repository.into()
    }

    fn named(service_name: &str) -> Self {
        let mut config = Self::default();
        config.service.name = service_name.to_string();
        config
    }

    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Current working directory
        paths.push(PathBuf::from("config.toml"));

        // 2. XDG config directory
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_DIR);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Ok(path) = xdg_dirs.place_config_file(&config_file_path) {
            paths.push(path);
        }

        // 3. System-wide directory
        paths.push(
            PathBuf::from("/etc")
                .join(APP_DIR)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: APP_DIR.to_string(),
                log_level: default_log_level(),
                environment: default_environment(),
            },
            repository: RepositoryConfig::default(),
        }
    }
}
