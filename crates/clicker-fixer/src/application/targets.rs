//! Presentation targets and the ordered registry the dispatcher walks.
//!
//! A *target* is one presentation application that can report whether a
//! show is currently live and accept "advance" / "retreat" requests.  The
//! registry is built once at startup; its order is the dispatch priority
//! (the first active target wins) and never changes while the process runs.

use tracing::{debug, info};

/// The capability every presentation backend exposes to the dispatcher.
///
/// Implementations must contain their own failures:
///
/// - [`is_active`](Self::is_active) reports `false` on any internal error so
///   the dispatcher falls back to pass-through.
/// - [`advance`](Self::advance) / [`retreat`](Self::retreat) are
///   fire-and-forget and never surface errors.
/// - [`release`](Self::release) is idempotent.
#[cfg_attr(test, mockall::automock)]
pub trait PresentationTarget: Send {
    /// Display name used in notifications and logs.
    fn name(&self) -> &'static str;

    /// Best-effort, non-blocking check whether a show is live.
    fn is_active(&self) -> bool;

    /// Moves the live show forward one step.
    fn advance(&self);

    /// Moves the live show back one step.
    fn retreat(&self);

    /// Releases connections, workers, and other owned resources.
    fn release(&self);
}

/// Ordered collection of targets; order is dispatch priority.
pub struct TargetRegistry {
    targets: Vec<Box<dyn PresentationTarget>>,
    released: bool,
}

impl TargetRegistry {
    /// Creates a registry that dispatches in the order given.
    pub fn new(targets: Vec<Box<dyn PresentationTarget>>) -> Self {
        Self {
            targets,
            released: false,
        }
    }

    /// Returns the first target whose `is_active()` is `true`.
    ///
    /// Targets after the first active one are not queried.
    pub fn first_active(&self) -> Option<&dyn PresentationTarget> {
        self.targets
            .iter()
            .map(|t| t.as_ref())
            .find(|t| t.is_active())
    }

    /// Target names in priority order.
    pub fn names(&self) -> Vec<&'static str> {
        self.targets.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Releases every target exactly once.  Later calls are no-ops.
    pub fn release_all(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for target in &self.targets {
            debug!("releasing target {}", target.name());
            target.release();
        }
        info!("released {} presentation target(s)", self.targets.len());
    }
}

impl Drop for TargetRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}
