//! The raw keyboard event model shared by every input source backend.
//!
//! A [`RawInputEvent`] is captured by the input source *before* the operating
//! system delivers it to any application.  The dispatcher consumes each event
//! exactly once: it either suppresses it (a presentation target handled it) or
//! hands it back to the source unmodified for pass-through.
//!
//! # Key state encoding
//!
//! Low-level keyboard drivers report a small bit set per stroke:
//!
//! | Bit    | Meaning                                  |
//! |--------|------------------------------------------|
//! | `0x01` | key released ("break"), otherwise "make" |
//! | `0x02` | `E0` prefix (extended key)               |
//! | `0x04` | `E1` prefix (Pause/Break only)           |
//!
//! The four combinations of the first two bits are modelled as named
//! variants.  Anything else is preserved verbatim in [`KeyState::Other`] so
//! a pass-through never alters what the hardware sent.

use std::fmt;

/// Raw state bit: key released.
const STATE_BREAK: u16 = 0x01;
/// Raw state bit: `E0`-prefixed (extended) scan code.
const STATE_E0: u16 = 0x02;

/// Opaque handle of the hardware device that produced an event.
///
/// The value is only meaningful to the input source that issued it; it is
/// used to resolve the device's hardware identity string and to route a
/// pass-through back to the same device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub i32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

/// Broad class of the originating device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Keyboard,
    Mouse,
}

/// Make/break state of a key stroke, including the extended-key flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Key pressed.
    Make,
    /// Key released.
    Break,
    /// `E0`-prefixed key pressed (arrows, Page Up/Down, right-hand modifiers…).
    ExtendedMake,
    /// `E0`-prefixed key released.
    ExtendedBreak,
    /// Any other driver state bits, kept as-is.
    Other(u16),
}

impl KeyState {
    /// Decodes the driver's raw state bits.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => KeyState::Make,
            STATE_BREAK => KeyState::Break,
            STATE_E0 => KeyState::ExtendedMake,
            r if r == STATE_E0 | STATE_BREAK => KeyState::ExtendedBreak,
            other => KeyState::Other(other),
        }
    }

    /// Encodes the state back into the driver's raw bits.
    pub fn to_raw(self) -> u16 {
        match self {
            KeyState::Make => 0,
            KeyState::Break => STATE_BREAK,
            KeyState::ExtendedMake => STATE_E0,
            KeyState::ExtendedBreak => STATE_E0 | STATE_BREAK,
            KeyState::Other(raw) => raw,
        }
    }
}

/// One captured keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputEvent {
    /// Device that produced the stroke.
    pub device: DeviceId,
    /// Class of that device.
    pub class: DeviceClass,
    /// Hardware scan code.
    pub code: u16,
    /// Make/break state.
    pub state: KeyState,
    /// Driver-specific extra data, forwarded verbatim on pass-through.
    pub information: u32,
}

impl RawInputEvent {
    /// Convenience constructor for a keyboard stroke with no extra data.
    pub fn keyboard(device: DeviceId, code: u16, state: KeyState) -> Self {
        Self {
            device,
            class: DeviceClass::Keyboard,
            code,
            state,
            information: 0,
        }
    }

    /// `true` when this is the keyboard, extended key-down shape that
    /// presentation remotes emit for their navigation buttons.
    pub fn is_remote_candidate(&self) -> bool {
        self.class == DeviceClass::Keyboard && self.state == KeyState::ExtendedMake
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_state_decodes_named_combinations() {
        assert_eq!(KeyState::from_raw(0x00), KeyState::Make);
        assert_eq!(KeyState::from_raw(0x01), KeyState::Break);
        assert_eq!(KeyState::from_raw(0x02), KeyState::ExtendedMake);
        assert_eq!(KeyState::from_raw(0x03), KeyState::ExtendedBreak);
    }

    #[test]
    fn test_key_state_keeps_unknown_bits_verbatim() {
        // Arrange: E1 prefix used by the Pause key
        let state = KeyState::from_raw(0x04);

        // Act / Assert
        assert_eq!(state, KeyState::Other(0x04));
        assert_eq!(state.to_raw(), 0x04);
    }

    #[test]
    fn test_remote_candidate_requires_keyboard_extended_make() {
        let id = DeviceId(1);
        assert!(RawInputEvent::keyboard(id, 0x4D, KeyState::ExtendedMake).is_remote_candidate());
        assert!(!RawInputEvent::keyboard(id, 0x4D, KeyState::ExtendedBreak).is_remote_candidate());
        assert!(!RawInputEvent::keyboard(id, 0x4D, KeyState::Make).is_remote_candidate());

        let mouse = RawInputEvent {
            class: DeviceClass::Mouse,
            ..RawInputEvent::keyboard(id, 0x4D, KeyState::ExtendedMake)
        };
        assert!(!mouse.is_remote_candidate());
    }

    #[test]
    fn test_device_id_display() {
        assert_eq!(DeviceId(3).to_string(), "device#3");
    }
}
