//! Conversation state management.
//!
//! A conversation is the ordered transcript of one user's exchange with the
//! assistant, keyed by an opaque client-generated user id.

pub mod store;
pub mod types;

pub use store::{ConversationStore, InMemoryConversationStore};
pub use types::{Role, Turn};
