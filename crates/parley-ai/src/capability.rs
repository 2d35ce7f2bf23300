//! The chat capability seam: what a hosted chat backend must provide.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Default model identifier sent with every request.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";

/// Options passed alongside the prompt text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Model identifier understood by the backend
    pub model: String,
    /// Request incremental output instead of a single response
    pub stream: bool,
}

impl ChatOptions {
    /// Streaming options for the given model
    pub fn streaming(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            stream: true,
        }
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self::streaming(DEFAULT_MODEL)
    }
}

/// One incremental chunk of assistant text.
///
/// Backends may emit chunks with no text at all (keep-alives, metadata);
/// those read as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Fragment {
    /// Fragment carrying text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// Fragment with no text field
    pub fn empty() -> Self {
        Self { text: None }
    }

    /// The fragment's text, or `""` when absent
    pub fn as_str(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Consume the fragment, yielding its text or an empty string
    pub fn into_text(self) -> String {
        self.text.unwrap_or_default()
    }
}

/// A finite, non-restartable sequence of fragments. Any item may fail.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// A hosted chat backend.
///
/// Implementations own authentication, transport and model selection; callers
/// only see the prompt going in and fragments coming out.
#[async_trait]
pub trait ChatCapability: Send + Sync {
    /// Short human-readable backend name ("Anthropic", "mock", ...)
    fn name(&self) -> &str;

    /// Send `text` and return the response as a fragment stream
    async fn chat(&self, text: &str, options: &ChatOptions) -> Result<FragmentStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_text_reads_as_empty() {
        assert_eq!(Fragment::empty().as_str(), "");
        assert_eq!(Fragment::empty().into_text(), "");
        assert_eq!(Fragment::text("hi").as_str(), "hi");
    }

    #[test]
    fn test_fragment_deserializes_without_text() {
        let fragment: Fragment = serde_json::from_str("{}").unwrap();
        assert_eq!(fragment, Fragment::empty());

        let fragment: Fragment = serde_json::from_str(r#"{"text":"Hel"}"#).unwrap();
        assert_eq!(fragment.as_str(), "Hel");
    }

    #[test]
    fn test_default_options_stream() {
        let opts = ChatOptions::default();
        assert!(opts.stream);
        assert_eq!(opts.model, DEFAULT_MODEL);
    }
}
