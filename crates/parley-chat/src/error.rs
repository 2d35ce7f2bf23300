//! Error types for parley-chat

use std::time::Duration;
use thiserror::Error;

use crate::events::FailureReason;

/// Result type alias using parley-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a chat turn
#[derive(Error, Debug)]
pub enum Error {
    /// The chat capability did not become available in time
    #[error("Chat capability not ready after {}ms", waited.as_millis())]
    ReadinessTimeout { waited: Duration },

    /// Opening the request or reading its stream failed
    #[error(transparent)]
    Transport(#[from] parley_ai::Error),

    /// Nothing left to send after trimming
    #[error("Prompt is empty")]
    EmptyPrompt,
}

impl Error {
    /// Classification carried by turn events
    pub fn reason(&self) -> FailureReason {
        match self {
            Error::ReadinessTimeout { .. } => FailureReason::ReadinessTimeout,
            Error::Transport(_) => FailureReason::Transport,
            Error::EmptyPrompt => FailureReason::EmptyPrompt,
        }
    }
}
