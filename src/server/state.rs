//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::assistant::{AssistantError, AssistantService, OpenAiAssistant};
use crate::config::RelayConfig;
use crate::conversations::{ConversationStore, InMemoryConversationStore};
use crate::relay::ChatRelay;

/// Shared application state.
pub struct AppState {
    /// Relay orchestrating store access and assistant calls.
    pub relay: ChatRelay,
}

impl AppState {
    /// Create the production state: in-memory store, streaming assistant.
    ///
    /// # Errors
    /// Returns an error if the assistant HTTP client cannot be created.
    pub fn new(config: &RelayConfig) -> Result<Arc<Self>, AssistantError> {
        let assistant = OpenAiAssistant::new(config.assistant.clone())?;
        Ok(Self::with_parts(
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(assistant),
        ))
    }

    /// Assemble state from injected parts. Used by tests to swap in a mock
    /// assistant or an alternative store.
    #[must_use]
    pub fn with_parts(
        store: Arc<dyn ConversationStore>,
        assistant: Arc<dyn AssistantService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            relay: ChatRelay::new(store, assistant),
        })
    }
}
