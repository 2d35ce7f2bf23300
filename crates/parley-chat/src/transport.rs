//! Chat transport adapter: prompt in, text fragments out

use std::{pin::Pin, sync::Arc};

use futures::StreamExt;
use parley_ai::{ChatCapability, ChatOptions, Fragment};
use tokio_stream::Stream;

use crate::error::{Error, Result};

/// A stream of assistant text fragments, in arrival order
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Adapter over an injected [`ChatCapability`]
#[derive(Clone)]
pub struct Transport {
    capability: Arc<dyn ChatCapability>,
}

impl Transport {
    pub fn new(capability: Arc<dyn ChatCapability>) -> Self {
        Self { capability }
    }

    /// Send `text` and stream back the response text.
    ///
    /// The prompt is trimmed first and must not be empty. Errors from the call
    /// itself or from any streamed item surface as [`Error::Transport`];
    /// fragments without text come through as empty strings.
    pub async fn send_message(&self, text: &str, options: &ChatOptions) -> Result<TextStream> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyPrompt);
        }

        tracing::debug!(
            backend = self.capability.name(),
            model = %options.model,
            stream = options.stream,
            "opening chat stream"
        );

        let fragments = self
            .capability
            .chat(text, options)
            .await
            .inspect_err(|e| log_failure(e, "chat request failed"))?;

        Ok(Box::pin(fragments.map(|item| {
            item.map(Fragment::into_text)
                .inspect_err(|e| log_failure(e, "chat stream failed"))
                .map_err(Error::Transport)
        })))
    }
}

/// Remote failures are expected now and then; local ones mean misconfiguration
fn log_failure(error: &parley_ai::Error, context: &'static str) {
    if error.is_remote() {
        tracing::warn!(error = %error, "{context}");
    } else {
        tracing::error!(error = %error, "{context}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedCapability, Step};

    async fn collect(stream: TextStream) -> Vec<std::result::Result<String, String>> {
        stream
            .map(|item| item.map_err(|e| e.to_string()))
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_fragments_in_order() {
        let capability = Arc::new(ScriptedCapability::text(&["Hel", "lo"]));
        let transport = Transport::new(capability.clone());

        let stream = transport
            .send_message("  hi  ", &ChatOptions::streaming("m1"))
            .await
            .unwrap();

        assert_eq!(collect(stream).await, vec![Ok("Hel".into()), Ok("lo".into())]);

        let calls = capability.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "hi");
        assert_eq!(calls[0].1, ChatOptions::streaming("m1"));
    }

    #[tokio::test]
    async fn test_missing_text_is_empty_string() {
        let capability = Arc::new(ScriptedCapability::new(vec![
            Step::Text("a"),
            Step::NoText,
            Step::Text("b"),
        ]));
        let stream = Transport::new(capability)
            .send_message("hi", &ChatOptions::default())
            .await
            .unwrap();

        assert_eq!(
            collect(stream).await,
            vec![Ok("a".into()), Ok(String::new()), Ok("b".into())]
        );
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_before_call() {
        let capability = Arc::new(ScriptedCapability::text(&["x"]));
        let result = Transport::new(capability.clone())
            .send_message(" \n\t ", &ChatOptions::default())
            .await;

        assert!(matches!(result, Err(Error::EmptyPrompt)));
        assert!(capability.calls().is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_is_transport_error() {
        let capability = Arc::new(ScriptedCapability::failing_open());
        let result = Transport::new(capability)
            .send_message("hi", &ChatOptions::default())
            .await;

        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_stream_failure_is_transport_error() {
        let capability = Arc::new(ScriptedCapability::new(vec![
            Step::Text("partial"),
            Step::Fail("connection reset"),
        ]));
        let stream = Transport::new(capability)
            .send_message("hi", &ChatOptions::default())
            .await
            .unwrap();

        let items = collect(stream).await;
        assert_eq!(items[0], Ok("partial".into()));
        assert_eq!(items[1], Err("SSE error: connection reset".into()));
    }
}
