use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::ChatId;
use tokio::sync::RwLock;

/// Conversation id -> provider session token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn session(&self, chat_id: ChatId) -> Option<String>;

    async fn advance(&self, chat_id: ChatId, session_id: String);
}

type ConsistentState = Arc<RwLock<HashMap<ChatId, String>>>;

/// Lives as long as the process; a restart starts every chat from scratch.
#[derive(Clone, Default)]
pub struct InMemorySessions {
    state: ConsistentState,
}

impl InMemorySessions {
    pub fn new() -> InMemorySessions {
        InMemorySessions::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessions {
    async fn session(&self, chat_id: ChatId) -> Option<String> {
        let state = self.state.read().await;
        state.get(&chat_id).cloned()
    }

    async fn advance(&self, chat_id: ChatId, session_id: String) {
        let mut state = self.state.write().await;
        if let Some(prev) = state.insert(chat_id, session_id) {
            log::debug!("chat {} moved on from session {}", chat_id, prev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_chat_has_no_session() {
        let store = InMemorySessions::new();

        assert_eq!(store.session(ChatId(1)).await, None);
    }

    #[tokio::test]
    async fn advance_replaces_token_per_chat() {
        let store = InMemorySessions::new();

        store.advance(ChatId(1), "abc".to_string()).await;
        store.advance(ChatId(2), "xyz".to_string()).await;
        store.advance(ChatId(1), "def".to_string()).await;

        assert_eq!(store.session(ChatId(1)).await.as_deref(), Some("def"));
        assert_eq!(store.session(ChatId(2)).await.as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemorySessions::new();
        let handle = store.clone();

        handle.advance(ChatId(7), "abc".to_string()).await;

        assert_eq!(store.session(ChatId(7)).await.as_deref(), Some("abc"));
    }
}
