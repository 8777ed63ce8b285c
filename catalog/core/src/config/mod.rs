//! TOML Configuration File Support
//!
//! Centralized configuration for the pool catalogue. Every component receives
//! its own section of [`CatalogConfig`] at construction; nothing reads global
//! state after start-up.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables (`CATALOG_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! The default file location follows XDG Base Directory conventions:
//! `$XDG_CONFIG_HOME/pool-catalog/catalog.toml`.
//!
//! # Example Configuration
//!
//! ```toml
//! [catalog]
//! enable_virtual_pool = true
//! auto_route = "fixed_pool"
//! auto_route_pool = "fallback-pool"
//! default_pool_group = "standard"
//!
//! [selection]
//! capacity_accounting = true
//!
//! [cache]
//! route_ttl_secs = 10
//! descriptor_ttl_secs = 30
//!
//! [validation]
//! max_queue_name_length = 64
//! max_project_id_length = 256
//!
//! [store]
//! path = "/var/lib/pool-catalog/control.json"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Component Configuration
// =============================================================================

/// How an unmapped queue is placed when virtual pooling routes it on lookup
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AutoRoutePolicy {
    /// Same target resolution as `register` without a flavor
    #[default]
    DefaultPlacement,
    /// Always map to this pool
    FixedPool(String),
}

/// Router behaviour
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouterConfig {
    /// Auto-route unmapped queues on lookup
    pub enable_virtual_pool: bool,
    /// Placement used by auto-routing
    pub auto_route: AutoRoutePolicy,
    /// Pool used by `register` when no flavor is given
    pub default_pool: Option<String>,
    /// Group used by `register` when no flavor is given (ignored if
    /// `default_pool` is set)
    pub default_pool_group: Option<String>,
}

/// Pool selection behaviour
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionConfig {
    /// Exclude pools whose recorded usage has reached `max_capacity`
    pub capacity_accounting: bool,
}

/// Memoization lifetimes (zero disables the cache)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a `(project, queue) -> pool` lookup is reused
    pub route_ttl: Duration,
    /// How long a pool descriptor is reused before re-reading its version
    pub descriptor_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            route_ttl: Duration::from_secs(10),
            descriptor_ttl: Duration::from_secs(10),
        }
    }
}

/// Limits on names accepted by `register`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Longest accepted queue name
    pub max_queue_name_length: usize,
    /// Longest accepted project id
    pub max_project_id_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_queue_name_length: 64,
            max_project_id_length: 256,
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Catalog section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogToml {
    /// Auto-route unmapped queues on lookup
    pub enable_virtual_pool: Option<bool>,

    /// `"default_placement"` or `"fixed_pool"`
    pub auto_route: Option<String>,

    /// Pool used when `auto_route = "fixed_pool"`
    pub auto_route_pool: Option<String>,

    /// Default pool for registrations without a flavor
    pub default_pool: Option<String>,

    /// Default pool group for registrations without a flavor
    pub default_pool_group: Option<String>,
}

/// Selection section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionToml {
    /// Whether capacity accounting gates new placements
    pub capacity_accounting: Option<bool>,
}

/// Cache section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheToml {
    /// Route memoization lifetime in seconds (0 = disabled)
    pub route_ttl_secs: Option<u64>,

    /// Pool descriptor memoization lifetime in seconds (0 = disabled)
    pub descriptor_ttl_secs: Option<u64>,
}

/// Validation section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationToml {
    /// Longest accepted queue name
    pub max_queue_name_length: Option<usize>,

    /// Longest accepted project id
    pub max_project_id_length: Option<usize>,
}

/// Store section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreToml {
    /// Path of the JSON control store
    pub path: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFileToml {
    /// Router section
    pub catalog: CatalogToml,

    /// Selection section
    pub selection: SelectionToml,

    /// Cache section
    pub cache: CacheToml,

    /// Validation section
    pub validation: ValidationToml,

    /// Store section
    pub store: StoreToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the catalogue
///
/// Use [`load_config`] to load configuration with proper priority handling,
/// then hand the sections to the components that need them.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    /// Router behaviour
    pub router: RouterConfig,

    /// Pool selection behaviour
    pub selection: SelectionConfig,

    /// Memoization lifetimes
    pub cache: CacheConfig,

    /// Name limits
    pub validation: ValidationConfig,

    /// Path of the JSON control store (admin CLI)
    pub store_path: Option<PathBuf>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            router: RouterConfig::default(),
            selection: SelectionConfig::default(),
            cache: CacheConfig::default(),
            validation: ValidationConfig::default(),
            store_path: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl CatalogConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Enable or disable virtual pooling
    #[must_use]
    pub fn with_virtual_pool(mut self, enabled: bool) -> Self {
        self.router.enable_virtual_pool = enabled;
        self
    }

    /// Set the auto-route policy
    #[must_use]
    pub fn with_auto_route(mut self, policy: AutoRoutePolicy) -> Self {
        self.router.auto_route = policy;
        self
    }

    /// Set the default pool group for registrations without a flavor
    #[must_use]
    pub fn with_default_pool_group(mut self, group: impl Into<String>) -> Self {
        self.router.default_pool_group = Some(group.into());
        self
    }

    /// Set the default pool for registrations without a flavor
    #[must_use]
    pub fn with_default_pool(mut self, pool: impl Into<String>) -> Self {
        self.router.default_pool = Some(pool.into());
        self
    }

    /// Enable or disable capacity accounting
    #[must_use]
    pub fn with_capacity_accounting(mut self, enabled: bool) -> Self {
        self.selection.capacity_accounting = enabled;
        self
    }

    /// Set both memoization lifetimes
    #[must_use]
    pub fn with_cache_ttls(mut self, route_ttl: Duration, descriptor_ttl: Duration) -> Self {
        self.cache.route_ttl = route_ttl;
        self.cache.descriptor_ttl = descriptor_ttl;
        self
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let AutoRoutePolicy::FixedPool(pool) = &self.router.auto_route {
            if pool.is_empty() {
                return Err(ConfigError::ValidationError(
                    "auto_route = \"fixed_pool\" requires auto_route_pool".to_string(),
                ));
            }
        }
        if matches!(self.router.default_pool.as_deref(), Some("")) {
            return Err(ConfigError::ValidationError(
                "default_pool must not be empty".to_string(),
            ));
        }
        if matches!(self.router.default_pool_group.as_deref(), Some("")) {
            return Err(ConfigError::ValidationError(
                "default_pool_group must not be empty".to_string(),
            ));
        }
        if self.validation.max_queue_name_length == 0 || self.validation.max_project_id_length == 0
        {
            return Err(ConfigError::ValidationError(
                "name length limits must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/pool-catalog/catalog.toml` or
/// `~/.config/pool-catalog/catalog.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pool-catalog").join("catalog.toml"))
}

/// Default location of the file-backed control store
///
/// `$XDG_DATA_HOME/pool-catalog/catalog.json`, falling back to the working
/// directory when no data directory is known.
#[must_use]
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("pool-catalog"))
        .unwrap_or_default()
        .join("catalog.json")
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// merged configuration is inconsistent. A missing config file is not an error.
pub fn load_config() -> Result<CatalogConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<CatalogConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// Same as [`load_config_from_path`] but reads `CATALOG_*` variables through
/// `env` instead of the process environment.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed, or if the
/// result fails [`CatalogConfig::validate`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<CatalogConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = CatalogConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: CatalogFileToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

fn parse_auto_route(kind: &str, pool: Option<&String>) -> Result<AutoRoutePolicy, ConfigError> {
    match kind {
        "default_placement" => Ok(AutoRoutePolicy::DefaultPlacement),
        "fixed_pool" => Ok(AutoRoutePolicy::FixedPool(pool.cloned().unwrap_or_default())),
        other => Err(ConfigError::ValidationError(format!(
            "unknown auto_route policy {other:?} (expected \"default_placement\" or \"fixed_pool\")"
        ))),
    }
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut CatalogConfig, toml: &CatalogFileToml) -> Result<(), ConfigError> {
    if let Some(enabled) = toml.catalog.enable_virtual_pool {
        config.router.enable_virtual_pool = enabled;
    }
    if let Some(ref kind) = toml.catalog.auto_route {
        config.router.auto_route = parse_auto_route(kind, toml.catalog.auto_route_pool.as_ref())?;
    } else if let Some(ref pool) = toml.catalog.auto_route_pool {
        config.router.auto_route = AutoRoutePolicy::FixedPool(pool.clone());
    }
    if toml.catalog.default_pool.is_some() {
        config.router.default_pool = toml.catalog.default_pool.clone();
    }
    if toml.catalog.default_pool_group.is_some() {
        config.router.default_pool_group = toml.catalog.default_pool_group.clone();
    }

    if let Some(enabled) = toml.selection.capacity_accounting {
        config.selection.capacity_accounting = enabled;
    }

    if let Some(secs) = toml.cache.route_ttl_secs {
        config.cache.route_ttl = Duration::from_secs(secs);
    }
    if let Some(secs) = toml.cache.descriptor_ttl_secs {
        config.cache.descriptor_ttl = Duration::from_secs(secs);
    }

    if let Some(len) = toml.validation.max_queue_name_length {
        config.validation.max_queue_name_length = len;
    }
    if let Some(len) = toml.validation.max_project_id_length {
        config.validation.max_project_id_length = len;
    }

    if let Some(ref path) = toml.store.path {
        config.store_path = Some(PathBuf::from(path));
    }

    Ok(())
}

fn parse_flag(value: &str) -> bool {
    value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut CatalogConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(enabled) = env("CATALOG_ENABLE_VIRTUAL_POOL") {
        config.router.enable_virtual_pool = parse_flag(&enabled);
        config.source = ConfigSource::Env;
    }
    if let Some(pool) = env("CATALOG_AUTO_ROUTE_POOL") {
        config.router.auto_route = AutoRoutePolicy::FixedPool(pool);
        config.source = ConfigSource::Env;
    }
    if let Some(pool) = env("CATALOG_DEFAULT_POOL") {
        config.router.default_pool = Some(pool);
        config.source = ConfigSource::Env;
    }
    if let Some(group) = env("CATALOG_DEFAULT_POOL_GROUP") {
        config.router.default_pool_group = Some(group);
        config.source = ConfigSource::Env;
    }
    if let Some(enabled) = env("CATALOG_CAPACITY_ACCOUNTING") {
        config.selection.capacity_accounting = parse_flag(&enabled);
        config.source = ConfigSource::Env;
    }
    if let Some(ttl) = env("CATALOG_ROUTE_CACHE_TTL") {
        if let Ok(secs) = ttl.parse::<u64>() {
            config.cache.route_ttl = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(ttl) = env("CATALOG_DESCRIPTOR_CACHE_TTL") {
        if let Ok(secs) = ttl.parse::<u64>() {
            config.cache.descriptor_ttl = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(path) = env("CATALOG_STORE_PATH") {
        config.store_path = Some(PathBuf::from(path));
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Store path override
    pub store_path: Option<PathBuf>,

    /// Virtual pooling override
    pub enable_virtual_pool: Option<bool>,

    /// Default pool override
    pub default_pool: Option<String>,

    /// Default pool group override
    pub default_pool_group: Option<String>,

    /// Capacity accounting override
    pub capacity_accounting: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set store path override
    #[must_use]
    pub fn with_store_path(mut self, path: PathBuf) -> Self {
        self.store_path = Some(path);
        self
    }

    /// Set virtual pooling override
    #[must_use]
    pub fn with_virtual_pool(mut self, enabled: bool) -> Self {
        self.enable_virtual_pool = Some(enabled);
        self
    }

    /// Set default pool override
    #[must_use]
    pub fn with_default_pool(mut self, pool: String) -> Self {
        self.default_pool = Some(pool);
        self
    }

    /// Set default pool group override
    #[must_use]
    pub fn with_default_pool_group(mut self, group: String) -> Self {
        self.default_pool_group = Some(group);
        self
    }

    /// Set capacity accounting override
    #[must_use]
    pub fn with_capacity_accounting(mut self, enabled: bool) -> Self {
        self.capacity_accounting = Some(enabled);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut CatalogConfig) {
        if self.store_path.is_some()
            || self.enable_virtual_pool.is_some()
            || self.default_pool.is_some()
            || self.default_pool_group.is_some()
            || self.capacity_accounting.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref path) = self.store_path {
            config.store_path = Some(path.clone());
        }
        if let Some(enabled) = self.enable_virtual_pool {
            config.router.enable_virtual_pool = enabled;
        }
        if let Some(ref pool) = self.default_pool {
            config.router.default_pool = Some(pool.clone());
        }
        if let Some(ref group) = self.default_pool_group {
            config.router.default_pool_group = Some(group.clone());
        }
        if let Some(enabled) = self.capacity_accounting {
            config.selection.capacity_accounting = enabled;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();

        assert!(!config.router.enable_virtual_pool);
        assert_eq!(config.router.auto_route, AutoRoutePolicy::DefaultPlacement);
        assert_eq!(config.router.default_pool, None);
        assert!(!config.selection.capacity_accounting);
        assert_eq!(config.cache.route_ttl, Duration::from_secs(10));
        assert_eq!(config.validation.max_queue_name_length, 64);
        assert_eq!(config.validation.max_project_id_length, 256);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.to_string_lossy().contains("pool-catalog"));
            assert!(p.to_string_lossy().ends_with("catalog.toml"));
        }
    }

    // =========================================================================
    // TOML Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_valid_toml() {
        let file = write_toml(
            r#"
[catalog]
enable_virtual_pool = true
auto_route = "fixed_pool"
auto_route_pool = "fallback"
default_pool_group = "standard"

[selection]
capacity_accounting = true

[cache]
route_ttl_secs = 0
descriptor_ttl_secs = 30

[validation]
max_queue_name_length = 32

[store]
path = "/tmp/control.json"
"#,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert!(config.router.enable_virtual_pool);
        assert_eq!(
            config.router.auto_route,
            AutoRoutePolicy::FixedPool("fallback".to_string())
        );
        assert_eq!(config.router.default_pool_group.as_deref(), Some("standard"));
        assert!(config.selection.capacity_accounting);
        assert_eq!(config.cache.route_ttl, Duration::ZERO);
        assert_eq!(config.cache.descriptor_ttl, Duration::from_secs(30));
        assert_eq!(config.validation.max_queue_name_length, 32);
        assert_eq!(config.validation.max_project_id_length, 256);
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/control.json")));
        assert_eq!(config.source(), ConfigSource::File);
    }

    #[test]
    fn test_unknown_auto_route_rejected() {
        let file = write_toml("[catalog]\nauto_route = \"round_robin\"\n");
        let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_fixed_pool_requires_pool() {
        let file = write_toml("[catalog]\nauto_route = \"fixed_pool\"\n");
        let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
        assert!(err.to_string().contains("auto_route_pool"));
    }

    #[test]
    fn test_missing_file_graceful() {
        let path = PathBuf::from("/nonexistent/path/catalog.toml");
        let config = load_config_with_env(Some(path), no_env).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = write_toml("[catalog\nenable_virtual_pool = \"yes\"\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    // =========================================================================
    // Priority Ordering Tests
    // =========================================================================

    #[test]
    fn test_env_overrides_file() {
        let file = write_toml("[catalog]\ndefault_pool = \"file-pool\"\n");
        let env: HashMap<&str, &str> = [
            ("CATALOG_DEFAULT_POOL", "env-pool"),
            ("CATALOG_ENABLE_VIRTUAL_POOL", "true"),
            ("CATALOG_ROUTE_CACHE_TTL", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = load_config_with_env(Some(file.path().to_path_buf()), |k| {
            env.get(k).map(ToString::to_string)
        })
        .unwrap();

        assert_eq!(config.router.default_pool.as_deref(), Some("env-pool"));
        assert!(config.router.enable_virtual_pool);
        // Unparseable values are ignored
        assert_eq!(config.cache.route_ttl, Duration::from_secs(10));
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = CatalogConfig::default().with_default_pool("env-pool");
        config.set_source(ConfigSource::Env);

        ConfigOverrides::new()
            .with_default_pool("cli-pool".to_string())
            .with_virtual_pool(true)
            .apply(&mut config);

        assert_eq!(config.router.default_pool.as_deref(), Some("cli-pool"));
        assert!(config.router.enable_virtual_pool);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_config_overrides_empty_no_change() {
        let mut config = CatalogConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::Cli), "CLI");
        assert_eq!(format!("{}", ConfigSource::Env), "environment");
        assert_eq!(format!("{}", ConfigSource::File), "config file");
        assert_eq!(format!("{}", ConfigSource::Default), "default");
    }
}
