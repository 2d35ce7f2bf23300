//! parley-chat: conversation state and the streaming turn runtime
//!
//! A turn waits for the chat capability to be installed, sends the prompt,
//! and streams the reply into a placeholder message. [`ChatSession`] owns the
//! conversation and applies the [`TurnUpdate`]s produced by [`TurnDriver`].

pub mod conversation;
pub mod driver;
pub mod error;
pub mod events;
pub mod message;
pub mod readiness;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use conversation::Conversation;
pub use driver::{Turn, TurnDriver, TurnStream};
pub use error::{Error, Result};
pub use events::{FailureReason, TurnUpdate, UpdateKind};
pub use message::{Message, MessageId, Role};
pub use readiness::{
    CapabilitySlot, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, ReadinessStrategy, ReadinessWaiter,
};
pub use session::{ChatSession, ERROR_TEXT, GREETING, PatchOutcome, TurnOutcome, TurnPhase};
pub use transport::{TextStream, Transport};
