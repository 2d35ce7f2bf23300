//! Conversation state machine driven by turn updates

use futures::StreamExt;

use crate::{
    conversation::Conversation,
    driver::{Turn, TurnStream},
    events::{FailureReason, TurnUpdate, UpdateKind},
    message::{Message, MessageId, Role},
};

/// Seed message shown at the start of every conversation
pub const GREETING: &str = "Hi, I'm Claude! Ask me anything. I'm here to help with questions, creative tasks, analysis, coding, and much more.";

/// Shown in place of a reply when a turn fails
pub const ERROR_TEXT: &str = "⚠️ There was an error fetching the response. Please try again.";

/// Where the current turn is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnPhase {
    #[default]
    Idle,
    UserSubmitted,
    AssistantStreaming,
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(FailureReason),
}

impl TurnOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TurnOutcome::Completed)
    }
}

/// Result of applying one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Text was added to the placeholder
    Applied,
    /// The turn is over
    Finished(TurnOutcome),
    /// Not for the active turn; nothing changed
    Orphaned,
}

/// A conversation plus the bookkeeping for the turn in flight.
///
/// At most one turn is active at a time. [`submit`](Self::submit) refuses new
/// input until the active turn receives its terminal update or the session is
/// reset with [`new_chat`](Self::new_chat).
#[derive(Debug, Clone)]
pub struct ChatSession {
    conversation: Conversation,
    phase: TurnPhase,
    active: Option<MessageId>,
}

impl ChatSession {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            conversation: Conversation::new(greeting),
            phase: TurnPhase::Idle,
            active: None,
        }
    }

    /// Whether the typing indicator is on
    pub fn is_typing(&self) -> bool {
        self.active.is_some()
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn has_user_messages(&self) -> bool {
        self.conversation.has_user_messages()
    }

    /// Placeholder of the turn in flight
    pub fn active_placeholder(&self) -> Option<MessageId> {
        self.active
    }

    /// Record a user prompt and open a placeholder for the reply.
    ///
    /// Returns `None` without touching anything while a turn is in flight or
    /// when `input` is blank.
    pub fn submit(&mut self, input: &str) -> Option<Turn> {
        if self.is_typing() {
            tracing::debug!("submit ignored, turn in flight");
            return None;
        }
        let prompt = input.trim();
        if prompt.is_empty() {
            return None;
        }

        self.conversation.push(Role::User, prompt);
        let placeholder = self.conversation.push(Role::Assistant, "");
        self.active = Some(placeholder);
        self.phase = TurnPhase::UserSubmitted;

        tracing::debug!(%placeholder, chars = prompt.len(), "turn submitted");
        Some(Turn {
            prompt: prompt.to_string(),
            placeholder,
        })
    }

    /// Apply one update to the conversation
    pub fn apply(&mut self, update: &TurnUpdate) -> PatchOutcome {
        if self.active != Some(update.target) {
            tracing::trace!(target_id = %update.target, "dropping orphaned update");
            return PatchOutcome::Orphaned;
        }

        match &update.kind {
            UpdateKind::Fragment { text } => {
                if !self.conversation.append(update.target, text) {
                    return PatchOutcome::Orphaned;
                }
                self.phase = TurnPhase::AssistantStreaming;
                PatchOutcome::Applied
            }
            UpdateKind::Completed => {
                let empty = self
                    .conversation
                    .get(update.target)
                    .is_some_and(|m| m.content.is_empty());
                if empty {
                    tracing::warn!(target_id = %update.target, "stream completed without text");
                    self.conversation.fail(update.target, ERROR_TEXT);
                    self.finish(TurnOutcome::Failed(FailureReason::EmptyResponse))
                } else {
                    self.finish(TurnOutcome::Completed)
                }
            }
            UpdateKind::Failed { reason, detail } => {
                tracing::warn!(target_id = %update.target, ?reason, %detail, "turn failed");
                self.conversation.fail(update.target, ERROR_TEXT);
                self.finish(TurnOutcome::Failed(*reason))
            }
        }
    }

    fn finish(&mut self, outcome: TurnOutcome) -> PatchOutcome {
        self.active = None;
        self.phase = TurnPhase::Idle;
        PatchOutcome::Finished(outcome)
    }

    /// Fail the active turn because its stream ended without a terminal update.
    ///
    /// Returns `None` when no turn is in flight.
    pub fn abandon(&mut self) -> Option<TurnOutcome> {
        let target = self.active?;
        let update = TurnUpdate {
            target,
            kind: UpdateKind::Failed {
                reason: FailureReason::Transport,
                detail: "stream ended without a result".to_string(),
            },
        };
        match self.apply(&update) {
            PatchOutcome::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Start over with only the greeting. Safe to call mid-turn and more than once.
    pub fn new_chat(&mut self) {
        if let Some(placeholder) = self.active.take() {
            tracing::debug!(%placeholder, "abandoning turn in flight");
        }
        self.conversation.reset();
        self.phase = TurnPhase::Idle;
    }

    /// Consume a turn stream, applying every update and passing it to `observer`.
    ///
    /// Returns the outcome once the turn finishes. A stream that runs dry first
    /// fails the active turn via [`abandon`](Self::abandon); `None` means no
    /// turn was in flight.
    pub async fn drive(
        &mut self,
        mut stream: TurnStream,
        mut observer: impl FnMut(&TurnUpdate),
    ) -> Option<TurnOutcome> {
        while let Some(update) = stream.next().await {
            let outcome = self.apply(&update);
            observer(&update);
            if let PatchOutcome::Finished(outcome) = outcome {
                return Some(outcome);
            }
        }
        self.abandon()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(GREETING)
    }
}
