//! Storage infrastructure: configuration and allow-list persistence.
//!
//! - **`config`** – The TOML `AppConfig` in the platform config directory,
//!   with defaults for every field so first run needs no file.
//! - **`device_list`** – The operator-edited `devices.txt` allow-list that
//!   lives next to the config file.

pub mod config;
pub mod device_list;
