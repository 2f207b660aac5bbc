//! Domain types with no OS dependencies.
//!
//! - **`input`** – The immutable [`RawInputEvent`](input::RawInputEvent)
//!   produced by a low-level input source.
//! - **`device_filter`** – Hardware-identity prefix matching.
//! - **`keymap`** – Scan code to navigation action bindings.

pub mod device_filter;
pub mod input;
pub mod keymap;
