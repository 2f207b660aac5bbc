//! Presentation program backends and the registry factory.
//!
//! # Sub-modules
//!
//! - **`powerpoint`** – Local-process target driven through Office
//!   automation (`SlideShowAutomation`); the COM implementation lives in
//!   **`powerpoint_com`** (Windows only).
//!
//! - **`propresenter`** – Network-controlled target: a `WindowProbe` decides
//!   whether the show is live, and commands go out through a
//!   `CommandWorker`.  The Win32 probe lives in **`window_probe`**.
//!
//! Targets are chosen by an explicit [`TargetKind`] list from the
//! configuration; its order is the dispatch priority.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::targets::{PresentationTarget, TargetRegistry};
use crate::infrastructure::network::{
    command_worker::CommandWorker, websocket::WebSocketConnector, Credentials,
};
use crate::infrastructure::storage::config::{AppConfig, ProPresenterConfig};

pub mod powerpoint;
pub mod propresenter;

#[cfg(target_os = "windows")]
pub mod powerpoint_com;
#[cfg(target_os = "windows")]
pub mod window_probe;

use powerpoint::{platform_automation, PowerPointTarget};
use propresenter::{platform_probe, ProPresenterTarget, PROPRESENTER};

/// The presentation programs this build can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    PowerPoint,
    ProPresenter,
}

impl TargetKind {
    /// Default dispatch priority.
    pub const DEFAULT_ORDER: [TargetKind; 2] = [TargetKind::PowerPoint, TargetKind::ProPresenter];
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::PowerPoint => f.write_str("powerpoint"),
            TargetKind::ProPresenter => f.write_str("propresenter"),
        }
    }
}

/// Error type for target construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to start command worker for {target}: {source}")]
    WorkerSpawn {
        target: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Builds the target registry in the configured order.
///
/// Duplicate kinds are skipped with a warning.
///
/// # Errors
///
/// Returns [`RegistryError::WorkerSpawn`] if a background worker cannot be
/// started.
pub fn build_registry(config: &AppConfig) -> Result<TargetRegistry, RegistryError> {
    let mut seen = Vec::new();
    let mut targets: Vec<Box<dyn PresentationTarget>> = Vec::new();

    for kind in &config.targets.order {
        if seen.contains(kind) {
            warn!("target {kind} listed more than once; ignoring duplicate");
            continue;
        }
        seen.push(*kind);
        targets.push(build_target(*kind, config)?);
    }

    let registry = TargetRegistry::new(targets);
    info!("presentation targets in priority order: {:?}", registry.names());
    Ok(registry)
}

fn build_target(
    kind: TargetKind,
    config: &AppConfig,
) -> Result<Box<dyn PresentationTarget>, RegistryError> {
    match kind {
        TargetKind::PowerPoint => Ok(Box::new(PowerPointTarget::new(platform_automation()))),
        TargetKind::ProPresenter => Ok(Box::new(build_propresenter(&config.propresenter)?)),
    }
}

fn build_propresenter(config: &ProPresenterConfig) -> Result<ProPresenterTarget, RegistryError> {
    let connector = WebSocketConnector::new(&config.host, config.port);
    let credentials = Credentials {
        protocol: config.protocol.clone(),
        password: config.password.clone(),
    };
    let worker = CommandWorker::spawn(PROPRESENTER, Box::new(connector), credentials).map_err(
        |source| RegistryError::WorkerSpawn {
            target: PROPRESENTER,
            source,
        },
    )?;
    let probe = platform_probe(&config.process_name, &config.output_window_class);
    Ok(ProPresenterTarget::new(probe, worker))
}
