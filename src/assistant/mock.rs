//! Deterministic assistant used by tests.
//!
//! Returns a fixed reply (or a forced stream failure) and records every
//! context window it was handed, so tests can assert on what the relay
//! actually forwarded.

use tokio::sync::Mutex;

use crate::conversations::Turn;

use super::{AssistantError, AssistantService};

/// Scripted behaviour for one mock call.
enum Script {
    /// Always answer with this text.
    Reply(String),
    /// Always fail mid-stream.
    StreamFailure,
    /// Complete the stream with no accumulated text.
    EmptyReply,
}

/// Mock assistant service for tests.
pub struct MockAssistant {
    script: Script,
    windows: Mutex<Vec<Vec<Turn>>>,
}

impl MockAssistant {
    /// Mock that always replies with `reply`.
    #[must_use]
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            script: Script::Reply(reply.into()),
            windows: Mutex::new(Vec::new()),
        }
    }

    /// Mock that always fails mid-stream.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            script: Script::StreamFailure,
            windows: Mutex::new(Vec::new()),
        }
    }

    /// Mock whose stream completes without any text.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            script: Script::EmptyReply,
            windows: Mutex::new(Vec::new()),
        }
    }

    /// Context windows submitted so far, in call order.
    pub async fn observed_windows(&self) -> Vec<Vec<Turn>> {
        self.windows.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl AssistantService for MockAssistant {
    async fn reply(&self, context: &[Turn]) -> Result<String, AssistantError> {
        self.windows.lock().await.push(context.to_vec());

        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::StreamFailure => Err(AssistantError::Stream(
                "stream interrupted".to_string(),
            )),
            Script::EmptyReply => Err(AssistantError::EmptyReply),
        }
    }
}
