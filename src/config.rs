/*!
 * Configuration support for the RIPS library
 *
 * Provides runtime configuration options for customizing library behavior,
 * including the heuristic fallback thresholds of the segment parser — those
 * are configuration, not fixed values, since markerless files vary in shape.
 */

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::schema::{
    DEFAULT_CONTROL_MIN_COLUMNS, DEFAULT_PROVIDER_MIN_COLUMNS, DEFAULT_USER_MIN_COLUMNS,
};

/// Column-count thresholds for the heuristic fallback classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicThresholds {
    /// Minimum columns for a line to qualify as a control (CT) record
    #[serde(default = "default_control_min_columns")]
    pub control_min_columns: usize,

    /// Minimum columns for a line to qualify as a provider (AF) record
    #[serde(default = "default_provider_min_columns")]
    pub provider_min_columns: usize,

    /// Minimum columns for a line to qualify as a user (US) record
    #[serde(default = "default_user_min_columns")]
    pub user_min_columns: usize,
}

impl Default for HeuristicThresholds {
    fn default() -> Self {
        Self {
            control_min_columns: DEFAULT_CONTROL_MIN_COLUMNS,
            provider_min_columns: DEFAULT_PROVIDER_MIN_COLUMNS,
            user_min_columns: DEFAULT_USER_MIN_COLUMNS,
        }
    }
}

/// Global configuration for the RIPS library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RipsConfig {
    /// Whether to show progress bars during long operations
    #[serde(default = "default_enable_progress_bar")]
    pub enable_progress_bar: bool,

    /// Number of threads for parallel operations (None = use all available)
    #[serde(default)]
    pub parallel_threads: Option<usize>,

    /// Whether to skip unreadable files during batch loading (true) or fail
    /// on the first error (false)
    #[serde(default)]
    pub skip_unreadable_files: bool,

    /// Default export format
    #[serde(default)]
    pub default_export_format: crate::ExportFormat,

    /// Heuristic fallback thresholds for markerless files
    #[serde(default)]
    pub heuristic: HeuristicThresholds,
}

impl Default for RipsConfig {
    fn default() -> Self {
        Self {
            enable_progress_bar: default_enable_progress_bar(),
            parallel_threads: None,
            skip_unreadable_files: false,
            default_export_format: crate::ExportFormat::Json,
            heuristic: HeuristicThresholds::default(),
        }
    }
}

// Default value functions for serde
fn default_enable_progress_bar() -> bool {
    true
}

fn default_control_min_columns() -> usize {
    DEFAULT_CONTROL_MIN_COLUMNS
}

fn default_provider_min_columns() -> usize {
    DEFAULT_PROVIDER_MIN_COLUMNS
}

fn default_user_min_columns() -> usize {
    DEFAULT_USER_MIN_COLUMNS
}

impl RipsConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - `RIPS_PROGRESS_BAR`: "true" or "false"
    /// - `RIPS_PARALLEL_THREADS`: number or "auto"
    /// - `RIPS_SKIP_UNREADABLE`: "true" or "false"
    /// - `RIPS_CONTROL_MIN_COLUMNS`: number
    /// - `RIPS_PROVIDER_MIN_COLUMNS`: number
    /// - `RIPS_USER_MIN_COLUMNS`: number
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RIPS_PROGRESS_BAR") {
            config.enable_progress_bar = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("RIPS_PARALLEL_THREADS") {
            config.parallel_threads = match val.to_lowercase().as_str() {
                "auto" | "0" => None,
                num => num.parse().ok(),
            };
        }

        if let Ok(val) = std::env::var("RIPS_SKIP_UNREADABLE") {
            config.skip_unreadable_files = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("RIPS_CONTROL_MIN_COLUMNS") {
            if let Ok(n) = val.parse() {
                config.heuristic.control_min_columns = n;
            }
        }

        if let Ok(val) = std::env::var("RIPS_PROVIDER_MIN_COLUMNS") {
            if let Ok(n) = val.parse() {
                config.heuristic.provider_min_columns = n;
            }
        }

        if let Ok(val) = std::env::var("RIPS_USER_MIN_COLUMNS") {
            if let Ok(n) = val.parse() {
                config.heuristic.user_min_columns = n;
            }
        }

        config
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| crate::RipsError::Configuration {
                message: format!("Failed to parse config file: {}", e),
                suggestion: Some("Check that the file is valid TOML format".to_string()),
            })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::RipsError::Configuration {
                message: format!("Failed to serialize config: {}", e),
                suggestion: None,
            })?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/rips/config.toml` on Unix-like systems
    /// or `%APPDATA%\rips\config.toml` on Windows
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rips")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from the default location, environment, or defaults
    ///
    /// Priority order:
    /// 1. Default config file (if exists)
    /// 2. Environment variables
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Some(config_path) = Self::default_config_path() {
            if config_path.exists() {
                if let Ok(config) = Self::from_file(&config_path) {
                    return config;
                }
            }
        }

        Self::from_env()
    }

    /// Create a configuration optimized for bulk processing
    pub fn performance() -> Self {
        Self {
            enable_progress_bar: false,
            parallel_threads: None, // Use all available
            skip_unreadable_files: true,
            default_export_format: crate::ExportFormat::Json,
            heuristic: HeuristicThresholds::default(),
        }
    }

    /// Create a configuration optimized for predictability
    pub fn safe() -> Self {
        Self {
            enable_progress_bar: true,
            parallel_threads: Some(1), // Single-threaded for predictability
            skip_unreadable_files: false,
            default_export_format: crate::ExportFormat::Json,
            heuristic: HeuristicThresholds::default(),
        }
    }
}

// Global configuration support
use std::sync::RwLock;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: RwLock<Option<RipsConfig>> = RwLock::new(None);
}

/// Set the global configuration
pub fn set_global_config(config: RipsConfig) {
    *GLOBAL_CONFIG.write().unwrap() = Some(config);
}

/// Get the global configuration (or default if not set)
pub fn global_config() -> RipsConfig {
    GLOBAL_CONFIG.read().unwrap()
        .as_ref()
        .cloned()
        .unwrap_or_default()
}

/// Clear the global configuration
pub fn clear_global_config() {
    *GLOBAL_CONFIG.write().unwrap() = None;
}

/// Builder for customizing configuration
pub struct ConfigBuilder {
    config: RipsConfig,
}

impl ConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self {
            config: RipsConfig::default(),
        }
    }

    /// Set progress bar enabled
    pub fn progress_bar(mut self, enabled: bool) -> Self {
        self.config.enable_progress_bar = enabled;
        self
    }

    /// Set number of parallel threads
    pub fn parallel_threads(mut self, threads: Option<usize>) -> Self {
        self.config.parallel_threads = threads;
        self
    }

    /// Set skip unreadable files
    pub fn skip_unreadable_files(mut self, skip: bool) -> Self {
        self.config.skip_unreadable_files = skip;
        self
    }

    /// Set default export format
    pub fn default_export_format(mut self, format: crate::ExportFormat) -> Self {
        self.config.default_export_format = format;
        self
    }

    /// Set heuristic fallback thresholds
    pub fn heuristic(mut self, thresholds: HeuristicThresholds) -> Self {
        self.config.heuristic = thresholds;
        self
    }

    /// Build the configuration
    pub fn build(self) -> RipsConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
