//! Typed decoding of control-channel payloads.
//!
//! A payload is a JSON envelope:
//!
//! ```json
//! {"actionType": "SendMessage",
//!  "actionSettings": {"remote": "user@example.org", "type": "chat", "text": "hi"}}
//! ```
//!
//! Decoding is staged: the envelope first, then the settings for the
//! recognized action type. Each stage failing drops exactly that payload;
//! an unrecognized `actionType` is a no-op rather than an error.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::session::ChatMessage;

/// Errors from decoding a single control payload.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Payload is not a well-formed action envelope (not JSON, missing
    /// `actionType`, or `actionType` not a string).
    #[error("malformed control payload: {0}")]
    Envelope(#[source] serde_json::Error),

    /// `actionSettings` did not decode for the recognized action type.
    #[error("malformed settings for {action_type:?}: {source}")]
    Settings {
        /// The recognized action type whose settings failed to decode.
        action_type: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Wire envelope of a control payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    action_type: String,
    #[serde(default)]
    action_settings: Value,
}

/// A decoded control action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a message over the chat session.
    SendMessage(ChatMessage),
    /// An action type this build does not recognize; the consumer drops it.
    Unknown(String),
}

/// Decode one raw payload.
pub fn decode(payload: &[u8]) -> Result<Action, ActionError> {
    let Envelope {
        action_type,
        action_settings,
    } = serde_json::from_slice(payload).map_err(ActionError::Envelope)?;

    if action_type == "SendMessage" {
        let message: ChatMessage = serde_json::from_value(action_settings).map_err(|source| {
            ActionError::Settings {
                action_type: action_type.clone(),
                source,
            }
        })?;
        Ok(Action::SendMessage(message))
    } else {
        Ok(Action::Unknown(action_type))
    }
}
