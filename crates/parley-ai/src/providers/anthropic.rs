//! Anthropic Messages API capability

use crate::{
    capability::{ChatCapability, ChatOptions, Fragment, FragmentStream},
    error::{Error, Result},
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

/// Default API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Default cap on response length
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const API_VERSION: &str = "2023-06-01";

/// Chat capability backed by the Anthropic Messages API
pub struct AnthropicCapability {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicCapability {
    /// Create a new capability with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Override the API base URL (proxies, local gateways)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the response token cap
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key).map_err(|_| Error::InvalidApiKey)?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert("accept", HeaderValue::from_static("application/json"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn build_request(&self, text: &str, options: &ChatOptions) -> AnthropicRequest {
        AnthropicRequest {
            model: options.model.clone(),
            max_tokens: self.max_tokens,
            stream: options.stream,
            messages: vec![RequestMessage {
                role: "user",
                content: text.to_string(),
            }],
        }
    }

    async fn complete(&self, request_builder: reqwest::RequestBuilder) -> Result<FragmentStream> {
        let response = request_builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        let parsed: MessageResponse = serde_json::from_str(&body)?;
        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();

        Ok(Box::pin(futures::stream::once(async move {
            Ok(Fragment::text(text))
        })))
    }
}

#[async_trait]
impl ChatCapability for AnthropicCapability {
    fn name(&self) -> &str {
        "Anthropic"
    }

    async fn chat(&self, text: &str, options: &ChatOptions) -> Result<FragmentStream> {
        let request = self.build_request(text, options);
        let url = format!("{}/v1/messages", self.base_url);

        tracing::debug!(model = %options.model, stream = options.stream, "Anthropic API URL: {}", url);

        let request_builder = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&request);

        if !options.stream {
            return self.complete(request_builder).await;
        }

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source)))
    }
}

/// What a single SSE message means for the fragment stream
#[derive(Debug)]
pub(crate) enum SseAction {
    /// Emit a text fragment
    Fragment(Fragment),
    /// Nothing to emit (pings, block bookkeeping, usage)
    Skip,
    /// The response is complete
    Stop,
    /// The server reported an error
    Fail(Error),
}

/// Interpret one SSE message from the Messages stream
pub(crate) fn parse_event(event: &str, data: &str) -> SseAction {
    match event {
        "content_block_delta" => match serde_json::from_str::<ContentBlockDeltaEvent>(data) {
            Ok(delta) if delta.delta.delta_type == "text_delta" => {
                SseAction::Fragment(Fragment { text: delta.delta.text })
            }
            Ok(_) => SseAction::Skip,
            Err(e) => SseAction::Fail(Error::Json(e)),
        },
        "message_stop" => SseAction::Stop,
        "error" => match serde_json::from_str::<ErrorEvent>(data) {
            Ok(err) => SseAction::Fail(Error::api(err.error.error_type, err.error.message)),
            Err(_) => SseAction::Fail(Error::UnexpectedResponse(data.to_string())),
        },
        _ => SseAction::Skip,
    }
}

fn error_from_body(status: u16, body: &str) -> Error {
    match serde_json::from_str::<ErrorEvent>(body) {
        Ok(err) => Error::api(err.error.error_type, err.error.message),
        Err(_) => Error::UnexpectedResponse(format!("HTTP {}: {}", status, body)),
    }
}

/// Create the fragment stream from SSE events
fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = Result<Fragment>> {
    stream! {
        while let Some(event_result) = event_source.next().await {
            match event_result {
                Ok(Event::Open) => {}
                Ok(Event::Message(message)) => match parse_event(&message.event, &message.data) {
                    SseAction::Fragment(fragment) => yield Ok(fragment),
                    SseAction::Skip => {}
                    SseAction::Stop => break,
                    SseAction::Fail(e) => {
                        yield Err(e);
                        break;
                    }
                },
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    let body = response.text().await.unwrap_or_default();
                    yield Err(error_from_body(status.as_u16(), &body));
                    break;
                }
                Err(e) => {
                    yield Err(Error::Sse(e.to_string()));
                    break;
                }
            }
        }

        event_source.close();
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    stream: bool,
    messages: Vec<RequestMessage>,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockDeltaEvent {
    delta: DeltaInfo,
}

#[derive(Debug, Deserialize)]
struct DeltaInfo {
    #[serde(rename = "type")]
    delta_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEvent {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_delta_becomes_fragment() {
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#;
        match parse_event("content_block_delta", data) {
            SseAction::Fragment(f) => assert_eq!(f.as_str(), "Hel"),
            other => panic!("expected fragment, got {:?}", other),
        }
    }

    #[test]
    fn test_non_text_delta_is_skipped() {
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{"}}"#;
        assert!(matches!(parse_event("content_block_delta", data), SseAction::Skip));
    }

    #[test]
    fn test_bookkeeping_events_are_skipped() {
        assert!(matches!(parse_event("ping", "{}"), SseAction::Skip));
        assert!(matches!(
            parse_event("content_block_start", r#"{"index":0}"#),
            SseAction::Skip
        ));
        assert!(matches!(parse_event("message_delta", "{}"), SseAction::Skip));
    }

    #[test]
    fn test_message_stop_ends_stream() {
        assert!(matches!(
            parse_event("message_stop", r#"{"type":"message_stop"}"#),
            SseAction::Stop
        ));
    }

    #[test]
    fn test_error_event_fails() {
        let data = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        match parse_event("error", data) {
            SseAction::Fail(Error::Api { error_type, message }) => {
                assert_eq!(error_type, "overloaded_error");
                assert_eq!(message, "Overloaded");
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_delta_fails() {
        assert!(matches!(
            parse_event("content_block_delta", "not json"),
            SseAction::Fail(Error::Json(_))
        ));
    }

    #[test]
    fn test_error_body_without_json() {
        let e = error_from_body(502, "bad gateway");
        assert_eq!(e.to_string(), "Unexpected response: HTTP 502: bad gateway");
    }

    #[test]
    fn test_request_shape() {
        let capability = AnthropicCapability::new("sk-test").with_max_tokens(128);
        let request = capability.build_request("hello", &ChatOptions::streaming("claude-test"));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "claude-test");
        assert_eq!(json["max_tokens"], 128);
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let capability = AnthropicCapability::new("k").with_base_url("http://localhost:8080/");
        assert_eq!(capability.base_url, "http://localhost:8080");
    }
}
