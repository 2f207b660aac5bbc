//! Remote-control actions understood by network-controlled presentation
//! software.
//!
//! Every message is a JSON object whose `"action"` field names the variant;
//! any other fields sit beside it in the same object:
//!
//! ```json
//! {"action":"authenticate","protocol":"600","password":"secret"}
//! {"action":"presentationTriggerNext"}
//! {"action":"presentationTriggerPrevious"}
//! ```
//!
//! Serde's `#[serde(tag = "action")]` produces exactly this shape.

use serde::{Deserialize, Serialize};

/// Protocol version announced in the `authenticate` message.
pub const DEFAULT_PROTOCOL_VERSION: &str = "600";

/// An outbound remote-control action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RemoteAction {
    /// Application-level login sent right after the connection opens.
    Authenticate {
        /// Protocol version string.
        protocol: String,
        /// Operator-configured remote-control password.
        password: String,
    },
    /// Advance the live presentation by one cue/slide.
    PresentationTriggerNext,
    /// Step the live presentation back by one cue/slide.
    PresentationTriggerPrevious,
}

impl RemoteAction {
    /// Builds the `authenticate` action.
    pub fn authenticate(protocol: impl Into<String>, password: impl Into<String>) -> Self {
        RemoteAction::Authenticate {
            protocol: protocol.into(),
            password: password.into(),
        }
    }

    /// Serializes the action to its JSON text form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The wire name of the action.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteAction::Authenticate { .. } => "authenticate",
            RemoteAction::PresentationTriggerNext => "presentationTriggerNext",
            RemoteAction::PresentationTriggerPrevious => "presentationTriggerPrevious",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_next_serializes_to_action_only() {
        let text = RemoteAction::PresentationTriggerNext.to_json().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"action": "presentationTriggerNext"}));
    }

    #[test]
    fn test_previous_serializes_to_action_only() {
        let text = RemoteAction::PresentationTriggerPrevious.to_json().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"action": "presentationTriggerPrevious"}));
    }

    #[test]
    fn test_authenticate_carries_protocol_and_password() {
        // Arrange
        let action = RemoteAction::authenticate(DEFAULT_PROTOCOL_VERSION, "hunter2");

        // Act
        let value: Value = serde_json::from_str(&action.to_json().unwrap()).unwrap();

        // Assert
        assert_eq!(
            value,
            json!({"action": "authenticate", "protocol": "600", "password": "hunter2"})
        );
    }

    #[test]
    fn test_name_matches_serialized_tag() {
        for action in [
            RemoteAction::authenticate("600", ""),
            RemoteAction::PresentationTriggerNext,
            RemoteAction::PresentationTriggerPrevious,
        ] {
            let value: Value = serde_json::from_str(&action.to_json().unwrap()).unwrap();
            assert_eq!(value["action"], action.name());
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result: Result<RemoteAction, _> =
            serde_json::from_str(r#"{"action":"presentationClear"}"#);
        assert!(result.is_err());
    }
}
