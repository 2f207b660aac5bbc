//! # clicker-core
//!
//! Shared foundation for ClickerFixer: the raw keyboard event model, the
//! device allow-list filter, the navigation key bindings, and the JSON
//! messages sent to network-controlled presentation software.
//!
//! This crate has no dependencies on OS APIs, drivers, or network sockets.
//!
//! - **`domain`** – What a captured keystroke looks like, which hardware is
//!   eligible for interception, and which scan codes mean "next" or "previous".
//! - **`protocol`** – The outbound remote-control actions and the opaque
//!   command payloads queued for delivery.

pub mod domain;
pub mod protocol;

pub use domain::device_filter::{allowed, DeviceAllowList, DEFAULT_DEVICE_PREFIX};
pub use domain::input::{DeviceClass, DeviceId, KeyState, RawInputEvent};
pub use domain::keymap::{KeyBindings, NavigationAction};
pub use protocol::command::OutboundCommand;
pub use protocol::messages::RemoteAction;
