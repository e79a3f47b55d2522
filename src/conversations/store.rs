//! Conversation store trait and in-memory implementation.

use async_trait::async_trait;
use dashmap::DashMap;

use super::types::Turn;

/// Per-user transcript storage.
///
/// The trait is async so the in-process map used here can later be swapped for
/// a real datastore without touching the relay. Operations never fail: unknown
/// ids read as empty and writes materialize the entry on demand.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Return the stored transcript for `user_id`, empty if unknown.
    async fn get(&self, user_id: &str) -> Vec<Turn>;

    /// Append `turn` to the transcript for `user_id`, creating it if absent.
    async fn append(&self, user_id: &str, turn: Turn);

    /// Reset the transcript for `user_id` to empty, creating the entry if
    /// absent. The key itself is never deleted.
    async fn clear(&self, user_id: &str);
}

/// Thread-safe in-memory conversation store.
///
/// Individual operations are atomic at the map level, but nothing serializes
/// two concurrent requests for the same user id; clients hold one id per
/// browser session and send serially, so the race is accepted.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: DashMap<String, Vec<Turn>>,
}

impl InMemoryConversationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, user_id: &str) -> Vec<Turn> {
        self.conversations
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    async fn append(&self, user_id: &str, turn: Turn) {
        self.conversations
            .entry(user_id.to_string())
            .or_default()
            .push(turn);
    }

    async fn clear(&self, user_id: &str) {
        self.conversations.insert(user_id.to_string(), Vec::new());
    }
}
