//! Scan code bindings for the two navigation actions.
//!
//! Presentation remotes usually present themselves as a keyboard and send
//! the arrow keys (some models use Page Up/Down instead).  Which scan codes
//! count as "next" and "previous" is operator-configurable; the defaults are
//! the right and left arrow keys.

use serde::{Deserialize, Serialize};

/// Set-1 scan code of the right arrow key (sent with the `E0` prefix).
pub const SCAN_RIGHT: u16 = 0x4D;
/// Set-1 scan code of the left arrow key (sent with the `E0` prefix).
pub const SCAN_LEFT: u16 = 0x4B;

/// A navigation request derived from a key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationAction {
    Advance,
    Retreat,
}

/// Scan codes mapped to [`NavigationAction`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    /// Codes that advance one step.
    #[serde(default = "default_advance")]
    pub advance: Vec<u16>,
    /// Codes that go back one step.
    #[serde(default = "default_retreat")]
    pub retreat: Vec<u16>,
}

fn default_advance() -> Vec<u16> {
    vec![SCAN_RIGHT]
}

fn default_retreat() -> Vec<u16> {
    vec![SCAN_LEFT]
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            advance: default_advance(),
            retreat: default_retreat(),
        }
    }
}

impl KeyBindings {
    /// Looks up the action bound to `code`.  Advance bindings win if a code
    /// is listed in both sets.
    pub fn action_for(&self, code: u16) -> Option<NavigationAction> {
        if self.advance.contains(&code) {
            Some(NavigationAction::Advance)
        } else if self.retreat.contains(&code) {
            Some(NavigationAction::Retreat)
        } else {
            None
        }
    }
}
