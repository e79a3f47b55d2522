//! Streaming client for an OpenAI-compatible chat completions API.
//!
//! Behaviour:
//! - `POST {base}/v1/chat/completions` with `stream: true` and bearer auth.
//! - Consume the SSE byte stream, accumulating `choices[0].delta.content`
//!   until the `[DONE]` terminal event.
//! - No retry and no overall deadline; a connect timeout is the only limit
//!   imposed here, everything else is left to ambient transport limits.

use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AssistantConfig;
use crate::conversations::Turn;

use super::{AssistantError, AssistantService};

/// Connection timeout for the HTTP client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// SSE field prefix carrying event payloads.
const DATA_PREFIX: &str = "data:";

/// Terminal SSE payload marking the end of the stream.
const DONE_MARKER: &str = "[DONE]";

#[derive(Serialize)]
struct CompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Error body shape returned by OpenAI-compatible services.
#[derive(Deserialize)]
struct ErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Streaming assistant client for OpenAI-compatible services.
pub struct OpenAiAssistant {
    client: Client,
    config: AssistantConfig,
}

impl OpenAiAssistant {
    /// Create a client from the given configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AssistantConfig) -> Result<Self, AssistantError> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// Build the wire request from the system prompt and the context window.
    fn build_request<'a>(&'a self, context: &'a [Turn]) -> CompletionsRequest<'a> {
        let mut messages = Vec::with_capacity(context.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: &self.config.system_prompt,
        });
        for turn in context {
            messages.push(WireMessage {
                role: turn.role.as_str(),
                content: &turn.content,
            });
        }

        CompletionsRequest {
            model: &self.config.model,
            messages,
            stream: true,
        }
    }
}

#[async_trait::async_trait]
impl AssistantService for OpenAiAssistant {
    async fn reply(&self, context: &[Turn]) -> Result<String, AssistantError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let body = self.build_request(context);

        tracing::debug!(model = %self.config.model, turns = context.len(), "submitting context to assistant service");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&detail)
                .map_or(detail, |parsed| parsed.error.message);
            return Err(AssistantError::Api {
                status: status.as_u16(),
                message,
            });
        }

        accumulate_sse(response.bytes_stream()).await
    }
}

/// Consume an SSE byte stream and return the accumulated delta text.
///
/// Chunks arrive on arbitrary byte boundaries, so raw bytes are buffered and
/// only complete lines are decoded; a multibyte character split across two
/// chunks must survive reassembly intact.
async fn accumulate_sse<S, B, E>(mut stream: S) -> Result<String, AssistantError>
where
    S: futures::Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut pending: Vec<u8> = Vec::new();
    let mut reply = String::new();
    let mut done = false;

    'outer: while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| AssistantError::Stream(err.to_string()))?;
        pending.extend_from_slice(chunk.as_ref());

        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = pending.drain(..=pos).collect();
            let line = std::str::from_utf8(&line_bytes[..pos])
                .map_err(|err| AssistantError::Stream(format!("invalid utf-8 in stream: {err}")))?
                .trim_end_matches('\r');

            match sse_data(line) {
                Some(DONE_MARKER) => {
                    done = true;
                    break 'outer;
                }
                Some(data) => {
                    if let Some(text) = delta_text(data)? {
                        reply.push_str(&text);
                    }
                }
                None => {}
            }
        }
    }

    if !done {
        return Err(AssistantError::Stream(
            "stream ended before terminal event".to_string(),
        ));
    }
    if reply.is_empty() {
        return Err(AssistantError::EmptyReply);
    }

    Ok(reply)
}

/// Extract the payload of an SSE `data:` line, `None` for other lines.
fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).map(str::trim)
}

/// Decode one streamed chunk and return its delta text, if any.
fn delta_text(data: &str) -> Result<Option<String>, AssistantError> {
    let chunk: StreamChunk = serde_json::from_str(data)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_data_extracts_payload() {
        assert_eq!(sse_data("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_data("data:[DONE]"), Some("[DONE]"));
        assert_eq!(sse_data(": keep-alive comment"), None);
        assert_eq!(sse_data(""), None);
    }

    #[test]
    fn test_delta_text_reads_first_choice() {
        let data = r#"{"choices":[{"delta":{"content":"Hi "}}]}"#;
        assert_eq!(delta_text(data).unwrap_or_default(), Some("Hi ".to_string()));
    }

    #[test]
    fn test_delta_text_tolerates_missing_content() {
        let data = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(delta_text(data).unwrap_or_default(), None);

        let empty = r#"{"choices":[]}"#;
        assert_eq!(delta_text(empty).unwrap_or_default(), None);
    }

    #[test]
    fn test_delta_text_rejects_malformed_json() {
        assert!(delta_text("not json").is_err());
    }

    /// Turn byte chunks into the stream shape `accumulate_sse` consumes.
    fn chunk_stream(
        chunks: Vec<Vec<u8>>,
    ) -> impl futures::Stream<Item = Result<Vec<u8>, std::io::Error>> + Unpin {
        futures::stream::iter(chunks.into_iter().map(Ok))
    }

    fn delta_event(content: &str) -> Vec<u8> {
        let payload = serde_json::json!({ "choices": [{ "delta": { "content": content } }] });
        format!("data: {payload}\n\n").into_bytes()
    }

    const DONE_EVENT: &[u8] = b"data: [DONE]\n\n";

    #[tokio::test]
    async fn test_accumulates_deltas_across_events() -> Result<(), AssistantError> {
        let mut chunks = vec![delta_event("Hi "), delta_event("there")];
        chunks.push(DONE_EVENT.to_vec());

        let reply = accumulate_sse(chunk_stream(chunks)).await?;
        assert_eq!(reply, "Hi there");
        Ok(())
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() -> Result<(), AssistantError> {
        // Split the event mid-"é" so its two UTF-8 bytes arrive in different
        // network chunks; the reply must come back intact, not as U+FFFD.
        let event = delta_event("café");
        let split = event
            .iter()
            .position(|&b| b == 0xC3)
            .map_or(event.len() / 2, |pos| pos + 1);
        let (head, tail) = event.split_at(split);

        let chunks = vec![head.to_vec(), tail.to_vec(), DONE_EVENT.to_vec()];
        let reply = accumulate_sse(chunk_stream(chunks)).await?;
        assert_eq!(reply, "café");
        Ok(())
    }

    #[tokio::test]
    async fn test_event_line_split_across_chunks() -> Result<(), AssistantError> {
        let event = delta_event("Hello");
        let (head, tail) = event.split_at(7);

        let chunks = vec![head.to_vec(), tail.to_vec(), DONE_EVENT.to_vec()];
        let reply = accumulate_sse(chunk_stream(chunks)).await?;
        assert_eq!(reply, "Hello");
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_without_terminal_event_is_an_error() {
        let result = accumulate_sse(chunk_stream(vec![delta_event("Hi")])).await;
        assert!(matches!(result, Err(AssistantError::Stream(_))));
    }

    #[tokio::test]
    async fn test_terminal_event_without_text_is_empty_reply() {
        let result = accumulate_sse(chunk_stream(vec![DONE_EVENT.to_vec()])).await;
        assert!(matches!(result, Err(AssistantError::EmptyReply)));
    }

    #[tokio::test]
    async fn test_transport_error_mid_stream_is_surfaced() {
        let items: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(delta_event("partial")),
            Err(std::io::Error::other("connection reset")),
        ];
        let result = accumulate_sse(futures::stream::iter(items)).await;
        assert!(matches!(result, Err(AssistantError::Stream(_))));
    }

    #[test]
    fn test_build_request_prepends_system_prompt() {
        let config = AssistantConfig {
            api_key: "k".to_string(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            system_prompt: "You are a test.".to_string(),
        };
        let assistant = match OpenAiAssistant::new(config) {
            Ok(a) => a,
            Err(_) => return,
        };

        let context = vec![Turn::user("Hello"), Turn::assistant("Hi")];
        let request = assistant.build_request(&context);

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].role, "user");
        assert_eq!(request.messages[1].content, "Hello");
        assert_eq!(request.messages[2].role, "assistant");
        assert!(request.stream);
    }
}
