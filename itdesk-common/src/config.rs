//! Configuration loading and root folder resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: a warning is logged
//! and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "itdesk.db";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Locale used when nothing else matches
pub const DEFAULT_LOCALE: &str = "en";

/// Default session lifetime
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Logging section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Per-operation request quotas (requests per minute)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    #[serde(default = "default_create_ticket_rate")]
    pub create_ticket_per_minute: u32,
    #[serde(default = "default_create_asset_rate")]
    pub create_asset_per_minute: u32,
    #[serde(default = "default_create_user_rate")]
    pub create_user_per_minute: u32,
    #[serde(default = "default_login_rate")]
    pub login_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            create_ticket_per_minute: default_create_ticket_rate(),
            create_asset_per_minute: default_create_asset_rate(),
            create_user_per_minute: default_create_user_rate(),
            login_per_minute: default_login_rate(),
        }
    }
}

fn default_create_ticket_rate() -> u32 {
    5
}

fn default_create_asset_rate() -> u32 {
    10
}

fn default_create_user_rate() -> u32 {
    5
}

fn default_login_rate() -> u32 {
    10
}

/// Contents of `config.toml`
///
/// Every field is optional so that partial files are valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub database_file: Option<String>,
    #[serde(default)]
    pub bind_address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub locales_dir: Option<PathBuf>,
    #[serde(default)]
    pub default_locale: Option<String>,
    #[serde(default)]
    pub session_ttl_hours: Option<i64>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
}

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind_address: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/itdesk (or /var/lib/itdesk for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("itdesk"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/itdesk"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("itdesk"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/itdesk"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("itdesk"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\itdesk"))
    } else {
        PathBuf::from("./itdesk_data")
    }
}

/// Locate the config file for this platform, if one exists
///
/// Linux checks `~/.config/itdesk/config.toml` first, then
/// `/etc/itdesk/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("itdesk").join("config.toml"));

    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/itdesk/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file if present, falling back to defaults with a warning
pub fn load_toml_config_or_default(explicit: Option<&Path>) -> TomlConfig {
    let path = match explicit.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => {
            info!("No config file found, using compiled defaults");
            return TomlConfig::default();
        }
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config file: {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} (continuing with defaults)", e);
            TomlConfig::default()
        }
    }
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Root folder resolution following the priority order in the module docs
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("[{}] Root folder from command line: {}", self.module_name, path.display());
            return path.clone();
        }

        for var in ["ITDESK_ROOT_FOLDER", "ITDESK_ROOT"] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    info!("[{}] Root folder from {}: {}", self.module_name, var, path);
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = &self.toml_root {
            info!("[{}] Root folder from config file: {}", self.module_name, path.display());
            return path.clone();
        }

        let path = CompiledDefaults::for_current_platform().root_folder;
        info!("[{}] Root folder from compiled default: {}", self.module_name, path.display());
        path
    }
}

/// Creates the root folder and derives file locations inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
    database_file: String,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self {
            root_folder,
            database_file: DATABASE_FILE.to_string(),
        }
    }

    /// Use a database file name other than `itdesk.db`
    pub fn with_database_file(mut self, file: Option<&str>) -> Self {
        if let Some(file) = file.filter(|f| !f.trim().is_empty()) {
            self.database_file = file.to_string();
        }
        self
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(&self.database_file)
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}

/// Command-line overrides handed down from the binary
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub locales_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Effective runtime configuration
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_address: String,
    pub port: u16,
    pub locales_dir: Option<PathBuf>,
    pub default_locale: String,
    pub session_ttl_hours: i64,
    pub log_level: String,
    pub rate_limits: RateLimitConfig,
}

impl Default for PortalConfig {
    fn default() -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        Self {
            bind_address: defaults.bind_address,
            port: defaults.port,
            locales_dir: None,
            default_locale: DEFAULT_LOCALE.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            log_level: defaults.log_level,
            rate_limits: RateLimitConfig::default(),
        }
    }
}

impl PortalConfig {
    /// Merge CLI → ENV → TOML → defaults
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Self {
        let defaults = PortalConfig::default();

        let bind_address = cli
            .bind_address
            .clone()
            .or_else(|| env_string("ITDESK_BIND"))
            .or_else(|| toml.bind_address.clone())
            .unwrap_or(defaults.bind_address);

        let port = cli
            .port
            .or_else(|| env_parse::<u16>("ITDESK_PORT"))
            .or(toml.port)
            .unwrap_or(defaults.port);

        let locales_dir = cli
            .locales_dir
            .clone()
            .or_else(|| env_string("ITDESK_LOCALES_DIR").map(PathBuf::from))
            .or_else(|| toml.locales_dir.clone());

        let log_level = cli
            .log_level
            .clone()
            .or_else(|| env_string("ITDESK_LOG_LEVEL"))
            .unwrap_or_else(|| toml.logging.level.clone());

        let session_ttl_hours = toml
            .session_ttl_hours
            .filter(|h| *h > 0)
            .unwrap_or(defaults.session_ttl_hours);

        Self {
            bind_address,
            port,
            locales_dir,
            default_locale: toml
                .default_locale
                .clone()
                .unwrap_or(defaults.default_locale),
            session_ttl_hours,
            log_level,
            rate_limits: toml.rate_limits.clone(),
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {}", name, raw);
            None
        }
    }
}
