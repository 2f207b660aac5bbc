//! Input capture infrastructure.
//!
//! An [`InputSource`] intercepts keystrokes *before* the operating system
//! delivers them to applications.  Every captured stroke is handed to the
//! dispatcher, which either swallows it or gives it back through
//! [`InputSource::pass_through`]; a stroke that is never passed through is
//! never seen by the foreground window.
//!
//! # Windows-Specific Implementation
//!
//! On Windows the source is backed by the Interception kernel driver, which
//! (unlike `WH_KEYBOARD_LL` hooks) reports *which* physical device produced
//! each stroke.  The driver's user-mode library is loaded at runtime so a
//! missing DLL produces a clear startup diagnostic.
//!
//! # Testability
//!
//! [`mock::MockInputSource`] lets tests inject synthetic events, register
//! device identities, and inspect what was passed through.

use std::time::Duration;

use clicker_core::{DeviceId, RawInputEvent};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Outcome of a single bounded receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A stroke was captured.
    Event(RawInputEvent),
    /// The timeout elapsed without input.
    Idle,
    /// The source has ended and will produce no further events.
    Closed,
}

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to load input driver library {library}: {reason}")]
    LibraryUnavailable { library: String, reason: String },
    #[error("input driver library is missing export {0}")]
    MissingSymbol(&'static str),
    #[error("failed to create input driver context; ensure the driver is installed and the machine was rebooted afterwards")]
    ContextCreationFailed,
    #[error("failed to receive input: {0}")]
    Receive(String),
    #[error("failed to re-inject input for {device}: {reason}")]
    PassThrough { device: DeviceId, reason: String },
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// A low-level, device-aware keystroke source.
pub trait InputSource: Send {
    /// Waits up to `timeout` for the next stroke.
    ///
    /// The bound keeps the dispatch loop responsive to cancellation.
    fn receive(&mut self, timeout: Duration) -> Result<Received, CaptureError>;

    /// Re-injects `event` unmodified, as if it had never been intercepted.
    fn pass_through(&mut self, event: &RawInputEvent) -> Result<(), CaptureError>;

    /// Resolves the hardware identity string of `device`, if available.
    fn hardware_id(&mut self, device: DeviceId) -> Option<String>;
}

/// Opens the input source for the current platform.
///
/// # Errors
///
/// Returns a [`CaptureError`] when the driver cannot be loaded or no backend
/// exists for this platform.  Either is fatal for the process.
pub fn open_platform_source() -> Result<Box<dyn InputSource>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        let source = windows::InterceptionSource::open()?;
        Ok(Box::new(source))
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(CaptureError::UnsupportedPlatform(format!(
            "no device-aware keyboard interception backend for {}",
            std::env::consts::OS
        )))
    }
}

impl<S: InputSource + ?Sized> InputSource for Box<S> {
    fn receive(&mut self, timeout: Duration) -> Result<Received, CaptureError> {
        (**self).receive(timeout)
    }

    fn pass_through(&mut self, event: &RawInputEvent) -> Result<(), CaptureError> {
        (**self).pass_through(event)
    }

    fn hardware_id(&mut self, device: DeviceId) -> Option<String> {
        (**self).hardware_id(device)
    }
}
