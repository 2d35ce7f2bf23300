//! Runs one turn: readiness wait, request, fragments, one terminal update

use std::pin::Pin;

use futures::StreamExt;
use parley_ai::ChatOptions;
use tokio_stream::Stream;

use crate::{
    events::TurnUpdate,
    message::MessageId,
    readiness::ReadinessWaiter,
    transport::Transport,
};

/// Updates for a single turn. Ends with exactly one terminal update.
pub type TurnStream = Pin<Box<dyn Stream<Item = TurnUpdate> + Send>>;

/// A submitted prompt and the placeholder its reply streams into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub prompt: String,
    pub placeholder: MessageId,
}

/// Produces the update stream for a turn
#[derive(Clone)]
pub struct TurnDriver {
    waiter: ReadinessWaiter,
    options: ChatOptions,
}

impl TurnDriver {
    pub fn new(waiter: ReadinessWaiter, options: ChatOptions) -> Self {
        Self { waiter, options }
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// Start `turn`.
    ///
    /// Nothing happens until the stream is polled, and dropping it cancels the
    /// readiness wait and the request along with it.
    pub fn start(&self, turn: Turn) -> TurnStream {
        let waiter = self.waiter.clone();
        let options = self.options.clone();
        let target = turn.placeholder;

        Box::pin(async_stream::stream! {
            let capability = match waiter.wait_for_ready().await {
                Ok(capability) => capability,
                Err(e) => {
                    yield TurnUpdate::failed(target, &e);
                    return;
                }
            };

            let transport = Transport::new(capability);
            let mut fragments = match transport.send_message(&turn.prompt, &options).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    yield TurnUpdate::failed(target, &e);
                    return;
                }
            };

            let mut received = 0usize;
            while let Some(item) = fragments.next().await {
                match item {
                    Ok(text) => {
                        received += 1;
                        yield TurnUpdate::fragment(target, text);
                    }
                    Err(e) => {
                        tracing::debug!(%target, received, error = %e, "turn stopped early");
                        yield TurnUpdate::failed(target, &e);
                        return;
                    }
                }
            }

            tracing::debug!(%target, received, "chat stream finished");
            yield TurnUpdate::completed(target);
        })
    }
}
