//! Infrastructure layer for the clicker fixer.
//!
//! Contains OS-facing adapters: the keyboard interception driver, the
//! presentation program backends, the ProPresenter remote socket, and
//! file-system storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `clicker_core`, but MUST NOT be imported by the `application` or domain
//! layers (the one exception being the thread-priority helper below).

pub mod input_capture;
pub mod network;
pub mod storage;
pub mod targets;

/// Raises the calling thread to the highest normal priority.
///
/// Keyboard strokes are held by the driver until the dispatcher hands them
/// back, so the dispatch thread must not be starved by ordinary work.
/// Failure is logged and otherwise ignored.
pub fn raise_current_thread_priority() {
    #[cfg(target_os = "windows")]
    {
        use windows::Win32::System::Threading::{
            GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_HIGHEST,
        };
        // SAFETY: GetCurrentThread returns a pseudo-handle that needs no cleanup.
        if let Err(e) = unsafe { SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_HIGHEST) } {
            tracing::warn!("failed to raise dispatcher thread priority: {e}");
        }
    }
}
