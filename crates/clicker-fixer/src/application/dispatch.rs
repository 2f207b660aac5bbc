//! The event dispatcher: routes remote keystrokes to the active presentation.
//!
//! This is the heart of the application.  It pulls raw strokes from an
//! [`InputSource`], decides per stroke whether it came from an allow-listed
//! presentation remote while a presentation target is live, and either
//! forwards a navigation request to that target (swallowing the stroke) or
//! passes the stroke through unmodified so normal typing keeps working.
//!
//! # Decision per stroke
//!
//! ```text
//! keyboard + extended make? ── no ──▶ pass through
//!          │ yes
//! identity allow-listed?   ── no ──▶ pass through
//!          │ yes
//! first active target?     ── none ─▶ pass through, notify(None)
//!          │ some
//! advance / retreat / (unbound code: nothing), swallow, notify(Some(name))
//! ```
//!
//! An unbound key from the remote is swallowed too while a target is live,
//! so stray buttons (blank screen, laser toggle…) never leak into whatever
//! window has focus.
//!
//! # Threading
//!
//! [`spawn_dispatcher`] moves the dispatcher onto its own thread.  The only
//! state it shares with other threads is the cancellation flag and the
//! notification channel.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::Sender,
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clicker_core::{DeviceAllowList, KeyBindings, NavigationAction, RawInputEvent};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::targets::TargetRegistry;
use crate::infrastructure::input_capture::{CaptureError, InputSource, Received};

/// Default bound on a single blocking receive.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Error type for the dispatch loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The input source failed after startup.
    #[error("input source failed: {0}")]
    Capture(#[from] CaptureError),
    /// The dispatcher thread panicked.
    #[error("dispatcher thread panicked")]
    Panicked,
}

/// Emitted after every allow-listed remote keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchNotice {
    /// Name of the target that consumed the stroke, if any.
    pub handled_by: Option<&'static str>,
    /// Scan code of the stroke.
    pub code: u16,
}

/// What happened to a single stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handed back to the OS unmodified.
    PassedThrough,
    /// Consumed by `target`; `action` is `None` for unbound codes.
    Handled {
        target: &'static str,
        action: Option<NavigationAction>,
    },
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub passed_through: u64,
    pub handled: u64,
}

/// The dispatch loop and everything it owns.
pub struct Dispatcher<S: InputSource> {
    source: S,
    allow_list: DeviceAllowList,
    targets: TargetRegistry,
    keys: KeyBindings,
    poll_interval: Duration,
    cancelled: Arc<AtomicBool>,
    observer: Option<Sender<DispatchNotice>>,
    stats: DispatchStats,
}

impl<S: InputSource> Dispatcher<S> {
    /// Creates a dispatcher over `source` with the given allow-list,
    /// target priority order, and key bindings.
    pub fn new(
        source: S,
        allow_list: DeviceAllowList,
        targets: TargetRegistry,
        keys: KeyBindings,
    ) -> Self {
        Self {
            source,
            allow_list,
            targets,
            keys,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancelled: Arc::new(AtomicBool::new(false)),
            observer: None,
            stats: DispatchStats::default(),
        }
    }

    /// Sends a [`DispatchNotice`] to `observer` after each remote keystroke.
    pub fn with_observer(mut self, observer: Sender<DispatchNotice>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Overrides the receive bound (how quickly cancellation is noticed).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The shared flag that stops [`run`](Self::run) when set.
    pub fn cancellation(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Runs until the source closes, cancellation is requested, or the
    /// source fails.  Targets are released before returning.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Capture`] if the source fails mid-run.
    pub fn run(mut self) -> Result<DispatchStats, DispatchError> {
        info!(
            "dispatcher started: {} allow-listed prefix(es), targets {:?}",
            self.allow_list.len(),
            self.targets.names()
        );

        let result = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                info!("dispatcher cancelled");
                break Ok(());
            }
            match self.source.receive(self.poll_interval) {
                Ok(Received::Event(event)) => {
                    self.dispatch(event);
                }
                Ok(Received::Idle) => {}
                Ok(Received::Closed) => {
                    info!("input source closed");
                    break Ok(());
                }
                Err(e) => break Err(DispatchError::Capture(e)),
            }
        };

        self.targets.release_all();
        info!(
            "dispatcher stopped: received={}, passed_through={}, handled={}",
            self.stats.received, self.stats.passed_through, self.stats.handled
        );
        result.map(|()| self.stats)
    }

    /// Routes a single stroke.
    pub fn dispatch(&mut self, event: RawInputEvent) -> Disposition {
        self.stats.received += 1;

        if !event.is_remote_candidate() {
            return self.pass_through(&event);
        }

        let Some(identity) = self.source.hardware_id(event.device) else {
            debug!("{} has no hardware id; passing through", event.device);
            return self.pass_through(&event);
        };
        debug!(
            "{identity} code={:#04x} state={:?}",
            event.code, event.state
        );
        if !self.allow_list.allows(&identity) {
            return self.pass_through(&event);
        }

        let handled = self.targets.first_active().map(|target| {
            let action = self.keys.action_for(event.code);
            match action {
                Some(NavigationAction::Advance) => target.advance(),
                Some(NavigationAction::Retreat) => target.retreat(),
                None => {}
            }
            debug!("{} handled code {:#04x} as {action:?}", target.name(), event.code);
            Disposition::Handled {
                target: target.name(),
                action,
            }
        });

        let disposition = match handled {
            Some(handled) => {
                self.stats.handled += 1;
                handled
            }
            None => self.pass_through(&event),
        };

        let handled_by = match disposition {
            Disposition::Handled { target, .. } => Some(target),
            Disposition::PassedThrough => None,
        };
        self.notify(DispatchNotice {
            handled_by,
            code: event.code,
        });
        disposition
    }

    fn pass_through(&mut self, event: &RawInputEvent) -> Disposition {
        self.stats.passed_through += 1;
        if let Err(e) = self.source.pass_through(event) {
            warn!("pass-through failed: {e}");
        }
        Disposition::PassedThrough
    }

    fn notify(&mut self, notice: DispatchNotice) {
        if let Some(observer) = &self.observer {
            if observer.send(notice).is_err() {
                debug!("dispatch observer disconnected");
                self.observer = None;
            }
        }
    }
}

/// Handle to a dispatcher running on its own thread.
pub struct DispatcherHandle {
    cancelled: Arc<AtomicBool>,
    thread: JoinHandle<Result<DispatchStats, DispatchError>>,
}

impl DispatcherHandle {
    /// `true` once the loop has exited on its own (source closed or failed).
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Requests cancellation, waits for the loop to exit, and returns its
    /// result.  Targets are released on the dispatcher thread before this
    /// returns.
    pub fn stop(self) -> Result<DispatchStats, DispatchError> {
        self.cancelled.store(true, Ordering::Relaxed);
        self.thread.join().map_err(|_| DispatchError::Panicked)?
    }
}

/// Starts `dispatcher` on a dedicated, high-priority thread.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_dispatcher<S>(dispatcher: Dispatcher<S>) -> std::io::Result<DispatcherHandle>
where
    S: InputSource + 'static,
{
    let cancelled = dispatcher.cancellation();
    let thread = thread::Builder::new()
        .name("clicker-dispatch".to_string())
        .spawn(move || {
            crate::infrastructure::raise_current_thread_priority();
            dispatcher.run()
        })?;
    Ok(DispatcherHandle { cancelled, thread })
}
