//! Per-chat conversation state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    /// No doubt received from this chat yet.
    #[default]
    New,
    /// The welcome has been sent.
    Welcomed,
}

/// Chat id → state, with one lock per chat.
///
/// Chats never contend with each other; two messages from the same chat
/// serialize on that chat's lock.
#[derive(Default)]
pub struct ConversationStore {
    chats: Mutex<HashMap<i64, Arc<Mutex<ConversationState>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock a chat's state, creating it as `New` on first sight.
    pub async fn lock(&self, chat_id: i64) -> OwnedMutexGuard<ConversationState> {
        let entry = {
            let mut chats = self.chats.lock().await;
            chats.entry(chat_id).or_default().clone()
        };
        entry.lock_owned().await
    }

    /// Current state without holding the chat lock. `New` for unknown chats.
    pub async fn state(&self, chat_id: i64) -> ConversationState {
        let entry = self.chats.lock().await.get(&chat_id).cloned();
        match entry {
            Some(state) => *state.lock().await,
            None => ConversationState::New,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unknown_chat_is_new() {
        let store = ConversationStore::new();
        assert_eq!(store.state(100).await, ConversationState::New);
    }

    #[tokio::test]
    async fn test_state_persists_per_chat() {
        let store = ConversationStore::new();
        {
            let mut state = store.lock(100).await;
            assert_eq!(*state, ConversationState::New);
            *state = ConversationState::Welcomed;
        }
        assert_eq!(store.state(100).await, ConversationState::Welcomed);
        assert_eq!(store.state(200).await, ConversationState::New);
    }

    #[tokio::test]
    async fn test_same_chat_serializes() {
        let store = Arc::new(ConversationStore::new());
        let guard = store.lock(7).await;

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { *store.lock(7).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        assert_eq!(waiter.await.unwrap(), ConversationState::New);
    }

    #[tokio::test]
    async fn test_other_chats_do_not_wait() {
        let store = ConversationStore::new();
        let _held = store.lock(1).await;
        let other = tokio::time::timeout(Duration::from_millis(100), store.lock(2)).await;
        assert!(other.is_ok());
    }
}
