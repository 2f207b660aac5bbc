//! The `devices.txt` allow-list file.
//!
//! Plain text, one hardware-identity prefix per line.  The file is read
//! once at startup; when it does not exist it is created with the default
//! entry so the operator has something to edit.

use std::path::Path;

use clicker_core::DeviceAllowList;
use tracing::{info, warn};

use super::config::ConfigError;

/// File name of the allow-list inside the config directory.
pub const DEVICES_FILE_NAME: &str = "devices.txt";

/// Reads the allow-list at `path`, creating it with the default entry if
/// it is missing.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if an existing file cannot be read, or if a
/// missing file cannot be created.
pub fn load_or_create_allow_list(path: &Path) -> Result<DeviceAllowList, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let list = DeviceAllowList::parse(&contents);
            if list.is_empty() {
                warn!(
                    "{} lists no devices; every keystroke will pass through",
                    path.display()
                );
            } else {
                info!("loaded {} device prefix(es) from {}", list.len(), path.display());
            }
            Ok(list)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let list = DeviceAllowList::with_default_entry();
            write_allow_list(&list, path)?;
            info!("created {} with the default device entry", path.display());
            Ok(list)
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_allow_list(list: &DeviceAllowList, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, list.to_file_contents()).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
