//! Per-session conversation state and the session store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::{ConversationItem, ItemStatus, Role};

/// Ordered log of one session's items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    items: Vec<ConversationItem>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ConversationItem) {
        self.items.push(item);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ConversationItem::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ConversationItem::assistant(content));
    }

    pub fn push_bookkeeping(&mut self, role: Role, content: impl Into<String>, status: ItemStatus) {
        self.push(ConversationItem::bookkeeping(role, content, status));
    }

    /// Message items only, in log order. This is all a capability call ever sees.
    pub fn forwarding_view(&self) -> Vec<ConversationItem> {
        self.items
            .iter()
            .filter(|item| item.is_message())
            .cloned()
            .collect()
    }

    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Back to the initial empty state.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }
}

/// Handle to one session's state. Holding the lock serializes turns.
pub type SharedState = Arc<tokio::sync::Mutex<ConversationState>>;

/// In-memory map from session id to conversation state.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SharedState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, SharedState>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The session's state, created empty on first use.
    pub fn session(&self, id: &str) -> SharedState {
        Arc::clone(self.map().entry(id.to_string()).or_default())
    }

    /// Copy of the session's items, if it exists.
    pub async fn snapshot(&self, id: &str) -> Option<ConversationState> {
        let state = self.map().get(id).cloned()?;
        let guard = state.lock().await;
        Some(guard.clone())
    }

    /// Number of known sessions.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    pub async fn reset(&self, id: &str) {
        let state = self.map().get(id).cloned();
        if let Some(state) = state {
            state.lock().await.clear();
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        self.map().remove(id).is_some()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.map().keys().cloned().collect();
        ids.sort();
        ids
    }
}
