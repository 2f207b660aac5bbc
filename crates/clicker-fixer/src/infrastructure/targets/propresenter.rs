//! ProPresenter target: remote-controlled over its WebSocket interface.
//!
//! The show counts as live while ProPresenter's full-screen output window is
//! visible.  Navigation is fire-and-forget: the command is queued on the
//! target's [`CommandWorker`] and the dispatcher moves on immediately.

use clicker_core::{OutboundCommand, RemoteAction};
use thiserror::Error;
use tracing::debug;

use crate::application::targets::PresentationTarget;
use crate::infrastructure::network::command_worker::CommandWorker;

/// Display name of this target.
pub const PROPRESENTER: &str = "ProPresenter";

/// Window class of ProPresenter's main output window.
pub const OUTPUT_WINDOW_CLASS: &str = "ssDVIOutput0";

/// Executable name (without extension) of ProPresenter.
pub const PROCESS_NAME: &str = "propresenter";

/// Error type for window probing.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("window enumeration failed: {0}")]
    Enumeration(String),
    #[error("window probing is not supported on {0}")]
    Unsupported(&'static str),
}

/// Looks for the presentation program's output window.
#[cfg_attr(test, mockall::automock)]
pub trait WindowProbe: Send {
    /// `Some(visible)` for the first matching output window, `None` if the
    /// program has no such window.
    fn output_window_visible(&self) -> Result<Option<bool>, ProbeError>;
}

/// Probe for platforms without a window enumeration backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedWindowProbe;

impl WindowProbe for UnsupportedWindowProbe {
    fn output_window_visible(&self) -> Result<Option<bool>, ProbeError> {
        Err(ProbeError::Unsupported(std::env::consts::OS))
    }
}

/// The window probe for the current platform.
pub fn platform_probe(process_name: &str, window_class: &str) -> Box<dyn WindowProbe> {
    #[cfg(target_os = "windows")]
    {
        Box::new(super::window_probe::Win32WindowProbe::new(
            process_name,
            window_class,
        ))
    }

    #[cfg(not(target_os = "windows"))]
    {
        debug!("no window probe for {process_name}/{window_class} on this platform");
        Box::new(UnsupportedWindowProbe)
    }
}

/// [`PresentationTarget`] for ProPresenter.
pub struct ProPresenterTarget {
    probe: Box<dyn WindowProbe>,
    worker: CommandWorker,
}

impl ProPresenterTarget {
    pub fn new(probe: Box<dyn WindowProbe>, worker: CommandWorker) -> Self {
        Self { probe, worker }
    }

    fn trigger(&self, action: RemoteAction) {
        if let Some(command) = OutboundCommand::from_action(&action) {
            debug!("{PROPRESENTER}: queueing {}", action.name());
            self.worker.enqueue(command);
        }
    }
}

impl PresentationTarget for ProPresenterTarget {
    fn name(&self) -> &'static str {
        PROPRESENTER
    }

    fn is_active(&self) -> bool {
        match self.probe.output_window_visible() {
            Ok(Some(visible)) => visible,
            Ok(None) => false,
            Err(e) => {
                debug!("{PROPRESENTER}: not active: {e}");
                false
            }
        }
    }

    fn advance(&self) {
        self.trigger(RemoteAction::PresentationTriggerNext);
    }

    fn retreat(&self) {
        self.trigger(RemoteAction::PresentationTriggerPrevious);
    }

    fn release(&self) {
        self.worker.shutdown();
    }
}
