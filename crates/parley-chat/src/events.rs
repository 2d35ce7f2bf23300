//! Turn update events

use serde::{Deserialize, Serialize};

use crate::{error::Error, message::MessageId};

/// Why a turn failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The capability never became available
    ReadinessTimeout,
    /// The capability call or its stream raised an error
    Transport,
    /// The prompt was empty after trimming
    EmptyPrompt,
    /// The stream finished without producing any text
    EmptyResponse,
}

/// What happened to the in-progress assistant message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateKind {
    /// A chunk of text to append
    Fragment { text: String },
    /// The stream ended normally
    Completed,
    /// The turn failed; `detail` is for logs, never shown to the user
    Failed {
        reason: FailureReason,
        detail: String,
    },
}

/// An update addressed to one placeholder message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnUpdate {
    pub target: MessageId,
    #[serde(flatten)]
    pub kind: UpdateKind,
}

impl TurnUpdate {
    pub fn fragment(target: MessageId, text: impl Into<String>) -> Self {
        Self {
            target,
            kind: UpdateKind::Fragment { text: text.into() },
        }
    }

    pub fn completed(target: MessageId) -> Self {
        Self {
            target,
            kind: UpdateKind::Completed,
        }
    }

    pub fn failed(target: MessageId, error: &Error) -> Self {
        Self {
            target,
            kind: UpdateKind::Failed {
                reason: error.reason(),
                detail: error.to_string(),
            },
        }
    }

    /// Text carried by a fragment update
    pub fn fragment_text(&self) -> Option<&str> {
        match &self.kind {
            UpdateKind::Fragment { text } => Some(text),
            _ => None,
        }
    }

    /// Check if this update ends the turn
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, UpdateKind::Completed | UpdateKind::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_updates() {
        let id = MessageId(7);
        assert!(!TurnUpdate::fragment(id, "x").is_terminal());
        assert!(TurnUpdate::completed(id).is_terminal());
        assert!(TurnUpdate::failed(id, &Error::EmptyPrompt).is_terminal());
        assert_eq!(TurnUpdate::fragment(id, "x").fragment_text(), Some("x"));
        assert_eq!(TurnUpdate::completed(id).fragment_text(), None);
    }

    #[test]
    fn test_update_serializes_flat() {
        let json = serde_json::to_value(TurnUpdate::fragment(MessageId(3), "Hel")).unwrap();
        assert_eq!(json["target"], 3);
        assert_eq!(json["type"], "fragment");
        assert_eq!(json["text"], "Hel");
    }
}
