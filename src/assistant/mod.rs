//! External assistant service abstraction.
//!
//! The assistant is an opaque dependency: given conversation context it
//! produces a reply. The production client streams from an OpenAI-compatible
//! API; the mock returns deterministic text for tests.

pub mod mock;
pub mod openai;

pub use mock::MockAssistant;
pub use openai::OpenAiAssistant;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversations::Turn;

/// Errors produced while contacting the assistant service.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// HTTP request could not be sent or the connection failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("assistant api error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the service.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The event stream failed or ended before its terminal event.
    #[error("stream error: {0}")]
    Stream(String),

    /// A streamed chunk could not be decoded.
    #[error("malformed stream payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The stream completed without producing any reply text.
    #[error("assistant returned an empty reply")]
    EmptyReply,
}

/// A service that turns conversation context into a reply.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Submit `context` (oldest turn first) and return the accumulated reply
    /// text once the service's stream completes.
    ///
    /// # Errors
    /// Returns an error on transport failure, service-reported failure, or an
    /// empty accumulated reply.
    async fn reply(&self, context: &[Turn]) -> Result<String, AssistantError>;
}
