//! ClickerFixer entry point.
//!
//! Loads configuration, opens the keyboard interception driver, builds the
//! presentation targets, and runs the dispatcher until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config.toml + devices.txt
//!  └─ open_platform_source()      -- interception driver context
//!  └─ build_registry()            -- PowerPoint, ProPresenter (+ worker thread)
//!  └─ spawn_dispatcher()          -- high-priority dispatch thread
//!  └─ notice logger thread        -- logs every remote keystroke
//!  └─ wait for Ctrl-C, then stop and join
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clicker_fixer::application::dispatch::{spawn_dispatcher, DispatchNotice, Dispatcher};
use clicker_fixer::infrastructure::input_capture::open_platform_source;
use clicker_fixer::infrastructure::storage::config::{
    config_file_path, load_or_create_config, AppConfig, ConfigOrigin,
};
use clicker_fixer::infrastructure::storage::device_list::{
    load_or_create_allow_list, DEVICES_FILE_NAME,
};
use clicker_fixer::infrastructure::targets::build_registry;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Routes presentation-remote keystrokes to the running slide show.
///
/// Keystrokes from allow-listed remotes are swallowed and turned into
/// next/previous commands for PowerPoint or ProPresenter, whichever is
/// presenting; every other keystroke reaches the foreground window as usual.
#[derive(Debug, Parser)]
#[command(name = "clicker-fixer", version)]
struct Cli {
    /// ProPresenter remote-control port (overrides the config file).
    #[arg(short = 'p', long, env = "CLICKER_PROPRESENTER_PORT")]
    port: Option<u16>,

    /// ProPresenter remote password (overrides the config file).
    #[arg(short = 'r', long, env = "CLICKER_PROPRESENTER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to config.toml (default: the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the device allow-list (default: devices.txt next to the config).
    #[arg(long)]
    devices: Option<PathBuf>,

    /// Log level when `RUST_LOG` is not set (overrides the config file).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.propresenter.port = port;
        }
        if let Some(password) = &self.password {
            config.propresenter.password = password.clone();
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
    }

    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path().context("cannot locate the configuration directory"),
        }
    }

    fn devices_path(&self, config_path: &std::path::Path) -> PathBuf {
        self.devices
            .clone()
            .unwrap_or_else(|| config_path.with_file_name(DEVICES_FILE_NAME))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config_path()?;
    let (mut config, origin) = load_or_create_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    cli.apply_to(&mut config);

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    info!("ClickerFixer starting (config: {})", config_path.display());
    match origin {
        ConfigOrigin::Loaded => {}
        ConfigOrigin::CreatedDefault => {
            info!("wrote default configuration to {}", config_path.display())
        }
        ConfigOrigin::DefaultNotWritten(e) => warn!("could not write default configuration: {e}"),
    }

    let devices_path = cli.devices_path(&config_path);
    let allow_list = load_or_create_allow_list(&devices_path)
        .with_context(|| format!("failed to load {}", devices_path.display()))?;

    let source = open_platform_source().context("failed to open the keyboard interception driver")?;
    let registry = build_registry(&config).context("failed to set up presentation targets")?;

    // ── Notice logger ─────────────────────────────────────────────────────────
    let (notice_tx, notice_rx) = mpsc::channel::<DispatchNotice>();
    let notice_logger = std::thread::Builder::new()
        .name("clicker-notices".to_string())
        .spawn(move || {
            for notice in notice_rx {
                match notice.handled_by {
                    Some(target) => info!("remote key {:#04x} -> {target}", notice.code),
                    None => info!("remote key {:#04x} passed through (no active show)", notice.code),
                }
            }
        })
        .context("failed to start notice logger")?;

    let dispatcher = Dispatcher::new(source, allow_list, registry, config.keys.clone())
        .with_observer(notice_tx)
        .with_poll_interval(config.general.poll_interval());
    let handle = spawn_dispatcher(dispatcher).context("failed to start dispatcher thread")?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    info!("ClickerFixer ready.  Press Ctrl-C to exit.");

    while running.load(Ordering::Relaxed) && !handle.is_finished() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let stats = tokio::task::spawn_blocking(move || handle.stop())
        .await
        .context("dispatcher shutdown task failed")??;
    if notice_logger.join().is_err() {
        warn!("notice logger panicked");
    }

    info!(
        "ClickerFixer stopped ({} keystrokes, {} sent to a presentation)",
        stats.received, stats.handled
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_port_and_password() {
        // Arrange
        let cli = Cli::try_parse_from(["clicker-fixer", "-p", "1025", "-r", "s3cret"]).unwrap();
        let mut config = AppConfig::default();

        // Act
        cli.apply_to(&mut config);

        // Assert
        assert_eq!(config.propresenter.port, 1025);
        assert_eq!(config.propresenter.password, "s3cret");
    }

    #[test]
    fn test_cli_log_level_override() {
        let cli = Cli::try_parse_from(["clicker-fixer", "--log-level", "debug"]).unwrap();
        let mut config = AppConfig::default();

        cli.apply_to(&mut config);

        assert_eq!(config.general.log_level, "debug");
    }

    #[test]
    fn test_devices_default_sits_next_to_config() {
        let cli =
            Cli::try_parse_from(["clicker-fixer", "--config", "/etc/clicker/config.toml"]).unwrap();

        let config_path = cli.config_path().unwrap();

        assert_eq!(
            cli.devices_path(&config_path),
            PathBuf::from("/etc/clicker/devices.txt")
        );
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["clicker-fixer", "--port", "70000"]).is_err());
    }
}
