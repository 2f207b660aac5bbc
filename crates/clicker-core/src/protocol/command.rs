//! Opaque command payloads queued for a delivery worker.

use std::fmt;

use tracing::warn;

use super::messages::RemoteAction;

/// One remote action, already rendered to the text sent over the wire.
///
/// The delivery worker treats the payload as opaque: it never parses it and
/// never reorders commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand(String);

impl OutboundCommand {
    /// Renders `action` to JSON.
    ///
    /// Returns `None` (and logs) if serialization fails, which cannot happen
    /// for the string-only actions defined today.
    pub fn from_action(action: &RemoteAction) -> Option<Self> {
        match action.to_json() {
            Ok(json) => Some(Self(json)),
            Err(e) => {
                warn!("failed to encode {} action: {e}", action.name());
                None
            }
        }
    }

    /// The text payload.
    pub fn payload(&self) -> &str {
        &self.0
    }

    pub fn into_payload(self) -> String {
        self.0
    }
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_action_renders_json() {
        let cmd = OutboundCommand::from_action(&RemoteAction::PresentationTriggerNext)
            .expect("encodes");
        assert_eq!(cmd.payload(), r#"{"action":"presentationTriggerNext"}"#);
    }

    #[test]
    fn test_display_and_into_payload_match_wire_text() {
        let cmd = OutboundCommand::from_action(&RemoteAction::PresentationTriggerPrevious)
            .expect("encodes");
        let wire = r#"{"action":"presentationTriggerPrevious"}"#;
        assert_eq!(cmd.to_string(), wire);
        assert_eq!(cmd.into_payload(), wire);
    }
}
