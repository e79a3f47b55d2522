//! Chat relay: bridges client requests to the assistant service and the
//! conversation store.
//!
//! One relay call reads the trailing history window, records the user turn,
//! streams a reply from the assistant and records it. The user turn is stored
//! as soon as the message is accepted, so a failed assistant call still leaves
//! it in the transcript.

use std::sync::Arc;

use thiserror::Error;

use crate::assistant::{AssistantError, AssistantService};
use crate::conversations::{ConversationStore, Turn};

/// Maximum number of stored turns forwarded as context on each send. The new
/// user turn is appended on top of this window.
pub const HISTORY_WINDOW: usize = 25;

/// Errors produced by relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The caller did not supply a user id.
    #[error("user id is required")]
    MissingUserId,
    /// The assistant service call failed.
    #[error("assistant service error: {0}")]
    Assistant(#[from] AssistantError),
}

/// Orchestrates one user message exchange end to end.
pub struct ChatRelay {
    store: Arc<dyn ConversationStore>,
    assistant: Arc<dyn AssistantService>,
}

impl ChatRelay {
    /// Create a relay over the given store and assistant service.
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, assistant: Arc<dyn AssistantService>) -> Self {
        Self { store, assistant }
    }

    /// Relay one user message and return the assistant's reply text.
    ///
    /// # Errors
    /// Returns `MissingUserId` for an empty id, or the assistant failure. In
    /// the failure case the user turn has already been recorded.
    pub async fn send_message(&self, user_id: &str, message: &str) -> Result<String, RelayError> {
        if user_id.is_empty() {
            return Err(RelayError::MissingUserId);
        }

        let history = self.store.get(user_id).await;
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        let mut context = history[start..].to_vec();
        context.push(Turn::user(message));

        // Recorded before the assistant call, not gated on its success.
        self.store.append(user_id, Turn::user(message)).await;

        let reply = self.assistant.reply(&context).await?;

        self.store.append(user_id, Turn::assistant(&reply)).await;
        tracing::debug!(user_id, reply_chars = reply.len(), "exchange completed");

        Ok(reply)
    }

    /// Return the stored transcript for `user_id`.
    ///
    /// # Errors
    /// Returns `MissingUserId` for an empty id.
    pub async fn get_history(&self, user_id: &str) -> Result<Vec<Turn>, RelayError> {
        if user_id.is_empty() {
            return Err(RelayError::MissingUserId);
        }
        Ok(self.store.get(user_id).await)
    }

    /// Reset the transcript for `user_id` to empty.
    ///
    /// # Errors
    /// Returns `MissingUserId` for an empty id.
    pub async fn clear_history(&self, user_id: &str) -> Result<(), RelayError> {
        if user_id.is_empty() {
            return Err(RelayError::MissingUserId);
        }
        self.store.clear(user_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::assistant::MockAssistant;
    use crate::conversations::InMemoryConversationStore;

    fn relay_with(assistant: Arc<MockAssistant>) -> ChatRelay {
        ChatRelay::new(Arc::new(InMemoryConversationStore::new()), assistant)
    }

    #[tokio::test]
    async fn test_exchange_records_both_turns() -> Result<(), RelayError> {
        let assistant = Arc::new(MockAssistant::new("Hi there"));
        let relay = relay_with(Arc::clone(&assistant));

        let reply = relay.send_message("u1", "Hello").await?;
        assert_eq!(reply, "Hi there");

        let history = relay.get_history("u1").await?;
        assert_eq!(
            history,
            vec![Turn::user("Hello"), Turn::assistant("Hi there")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_user_id_is_rejected_before_any_side_effect() {
        let assistant = Arc::new(MockAssistant::new("unused"));
        let relay = relay_with(Arc::clone(&assistant));

        let result = relay.send_message("", "Hello").await;
        assert!(matches!(result, Err(RelayError::MissingUserId)));
        assert!(assistant.observed_windows().await.is_empty());
    }

    #[tokio::test]
    async fn test_forwards_only_recent_window_plus_new_turn() -> Result<(), RelayError> {
        let store = Arc::new(InMemoryConversationStore::new());
        for i in 0..30 {
            store.append("u1", Turn::user(format!("m{i}"))).await;
        }
        let assistant = Arc::new(MockAssistant::new("ok"));
        let relay = ChatRelay::new(store, Arc::clone(&assistant) as Arc<dyn AssistantService>);

        relay.send_message("u1", "latest").await?;

        let windows = assistant.observed_windows().await;
        assert_eq!(windows.len(), 1);
        let window = &windows[0];
        assert_eq!(window.len(), HISTORY_WINDOW + 1);
        assert_eq!(window[0].content, "m5");
        assert_eq!(window[HISTORY_WINDOW].content, "latest");
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_call_keeps_user_turn_without_reply() -> Result<(), RelayError> {
        let assistant = Arc::new(MockAssistant::failing());
        let relay = relay_with(assistant);

        let result = relay.send_message("u1", "Hello").await;
        assert!(matches!(
            result,
            Err(RelayError::Assistant(AssistantError::Stream(_)))
        ));

        let history = relay.get_history("u1").await?;
        assert_eq!(history, vec![Turn::user("Hello")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error_not_a_stored_turn() -> Result<(), RelayError> {
        let assistant = Arc::new(MockAssistant::empty());
        let relay = relay_with(assistant);

        let result = relay.send_message("u1", "Hello").await;
        assert!(matches!(
            result,
            Err(RelayError::Assistant(AssistantError::EmptyReply))
        ));

        let history = relay.get_history("u1").await?;
        assert_eq!(history, vec![Turn::user("Hello")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_then_send_starts_fresh() -> Result<(), RelayError> {
        let assistant = Arc::new(MockAssistant::new("again"));
        let relay = relay_with(Arc::clone(&assistant));

        relay.send_message("u1", "first").await?;
        relay.clear_history("u1").await?;
        assert!(relay.get_history("u1").await?.is_empty());

        relay.send_message("u1", "second").await?;
        let windows = assistant.observed_windows().await;
        // Second window carries no residue from before the clear.
        assert_eq!(windows[1], vec![Turn::user("second")]);
        Ok(())
    }
}
