//! TOML-based configuration persistence.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\ClickerFixer\config.toml`
//! - Linux:    `~/.config/clickerfixer/config.toml`
//! - macOS:    `~/Library/Application Support/ClickerFixer/config.toml`
//!
//! Example:
//!
//! ```toml
//! [general]
//! log_level = "info"
//! poll_interval_ms = 250
//!
//! [targets]
//! order = ["powerpoint", "propresenter"]
//!
//! [keys]
//! advance = [0x4D]
//! retreat = [0x4B]
//!
//! [propresenter]
//! host = "localhost"
//! port = 50001
//! password = ""
//! ```
//!
//! Every field has a serde default, so a partial file (or none at all)
//! yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clicker_core::protocol::DEFAULT_PROTOCOL_VERSION;
use clicker_core::KeyBindings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::targets::{
    propresenter::{OUTPUT_WINDOW_CLASS, PROCESS_NAME},
    TargetKind,
};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub keys: KeyBindings,
    #[serde(default)]
    pub propresenter: ProPresenterConfig,
}

/// Process-wide behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound on one blocking input receive.  Lower values make
    /// shutdown more responsive.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Which presentation programs to drive, in priority order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetsConfig {
    #[serde(default = "default_target_order")]
    pub order: Vec<TargetKind>,
}

/// ProPresenter remote-control endpoint and window detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProPresenterConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Network port set in ProPresenter's remote settings.
    #[serde(default = "default_port")]
    pub port: u16,
    /// ProPresenter "Remote" password.
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_process_name")]
    pub process_name: String,
    #[serde(default = "default_output_window_class")]
    pub output_window_class: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_poll_interval_ms() -> u64 {
    250
}
fn default_target_order() -> Vec<TargetKind> {
    TargetKind::DEFAULT_ORDER.to_vec()
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    50001
}
fn default_protocol() -> String {
    DEFAULT_PROTOCOL_VERSION.to_string()
}
fn default_process_name() -> String {
    PROCESS_NAME.to_string()
}
fn default_output_window_class() -> String {
    OUTPUT_WINDOW_CLASS.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl GeneralConfig {
    /// The poll interval as a `Duration`, never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            order: default_target_order(),
        }
    }
}

impl Default for ProPresenterConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: String::new(),
            protocol: default_protocol(),
            process_name: default_process_name(),
            output_window_class: default_output_window_class(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// What [`load_or_create_config`] found on disk.
///
/// Returned rather than logged because the config is read before the
/// tracing subscriber (whose level it supplies) is installed.
#[derive(Debug)]
pub enum ConfigOrigin {
    /// The file existed and was parsed.
    Loaded,
    /// The file was missing; defaults were written to it.
    CreatedDefault,
    /// The file was missing and the defaults could not be written.
    DefaultNotWritten(ConfigError),
}

/// Like [`load_config`], but writes the defaults to `path` on first run so
/// the operator has a file to edit.  A failed write is reported through
/// [`ConfigOrigin::DefaultNotWritten`], not as an error.
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_or_create_config(path: &Path) -> Result<(AppConfig, ConfigOrigin), ConfigError> {
    let exists = path.exists();
    let config = load_config(path)?;
    if exists {
        return Ok((config, ConfigOrigin::Loaded));
    }
    let origin = match save_config(&config, path) {
        Ok(()) => ConfigOrigin::CreatedDefault,
        Err(e) => ConfigOrigin::DefaultNotWritten(e),
    };
    Ok((config, origin))
}

/// Persists `config` to `path`.
///
/// Creates the config directory and file if they do not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the
/// `ClickerFixer` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("ClickerFixer"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("clickerfixer"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("ClickerFixer")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clicker-config-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    // ── AppConfig defaults ────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_propresenter_endpoint() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.propresenter.host, "localhost");
        assert_eq!(cfg.propresenter.port, 50001);
        assert_eq!(cfg.propresenter.password, "");
        assert_eq!(cfg.propresenter.protocol, "600");
        assert_eq!(cfg.propresenter.process_name, "propresenter");
        assert_eq!(cfg.propresenter.output_window_class, "ssDVIOutput0");
    }

    #[test]
    fn test_app_config_default_target_order_is_powerpoint_first() {
        let cfg = AppConfig::default();
        assert_eq!(
            cfg.targets.order,
            vec![TargetKind::PowerPoint, TargetKind::ProPresenter]
        );
    }

    #[test]
    fn test_general_config_defaults() {
        let cfg = GeneralConfig::default();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let cfg = GeneralConfig {
            poll_interval_ms: 0,
            ..GeneralConfig::default()
        };
        assert_eq!(cfg.poll_interval(), Duration::from_millis(1));
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_partial_file_fills_in_defaults() {
        // Arrange
        let toml_str = r#"
            [propresenter]
            port = 1025
            password = "hunter2"

            [keys]
            advance = [0x4D, 0x51]
        "#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("parse");

        // Assert
        assert_eq!(cfg.propresenter.port, 1025);
        assert_eq!(cfg.propresenter.password, "hunter2");
        assert_eq!(cfg.propresenter.host, "localhost");
        assert_eq!(cfg.keys.advance, vec![0x4D, 0x51]);
        assert_eq!(cfg.keys.retreat, KeyBindings::default().retreat);
        assert_eq!(cfg.general, GeneralConfig::default());
    }

    #[test]
    fn test_unknown_target_kind_is_a_parse_error() {
        let result: Result<AppConfig, _> = toml::from_str("[targets]\norder = [\"keynote\"]\n");
        assert!(result.is_err());
    }

    // ── File repository ───────────────────────────────────────────────────────

    #[test]
    fn test_load_config_missing_file_returns_defaults() {
        let path = temp_dir().join("absent.toml");

        let cfg = load_config(&path).expect("load");

        assert_eq!(cfg, AppConfig::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_load_or_create_config_writes_defaults_on_first_run() {
        // Arrange
        let path = temp_dir().join("nested").join("config.toml");

        // Act
        let (cfg, origin) = load_or_create_config(&path).expect("load");

        // Assert
        assert_eq!(cfg, AppConfig::default());
        assert!(matches!(origin, ConfigOrigin::CreatedDefault));
        assert_eq!(load_config(&path).expect("reload"), cfg);
    }

    #[test]
    fn test_load_or_create_config_reports_existing_file() {
        // Arrange
        let path = temp_dir().join("config.toml");
        std::fs::write(&path, "[propresenter]\nport = 1025\n").expect("write");

        // Act
        let (cfg, origin) = load_or_create_config(&path).expect("load");

        // Assert
        assert_eq!(cfg.propresenter.port, 1025);
        assert!(matches!(origin, ConfigOrigin::Loaded));
    }

    #[test]
    fn test_save_then_load_preserves_edits() {
        // Arrange
        let path = temp_dir().join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.propresenter.port = 60000;
        cfg.targets.order = vec![TargetKind::ProPresenter];

        // Act
        save_config(&cfg, &path).expect("save");
        let restored = load_config(&path).expect("load");

        // Assert
        assert_eq!(restored, cfg);
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let path = temp_dir().join("config.toml");
        std::fs::write(&path, "[propresenter\nport = ").expect("write");

        let result = load_config(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
