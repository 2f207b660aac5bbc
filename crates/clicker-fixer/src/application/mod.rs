//! Application layer for the clicker fixer.
//!
//! Use cases in this layer depend only on traits (`InputSource`,
//! `PresentationTarget`) and on the pure types from `clicker_core`, so the
//! routing rules can be exercised without a kernel driver or a running
//! presentation program.
//!
//! # Sub-modules
//!
//! - **`dispatch`** – The per-keystroke decision: swallow a remote's key and
//!   drive the active presentation, or pass the key through untouched.  It
//!   runs on every keystroke, so it must never block on a target.
//!
//! - **`targets`** – The `PresentationTarget` capability and the ordered
//!   registry that fixes dispatch priority for the life of the process.

pub mod dispatch;
pub mod targets;
