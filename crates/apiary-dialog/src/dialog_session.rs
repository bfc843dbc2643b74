//! In-memory session store keyed by chat id.
//!
//! Sessions hold the current dialog state plus the fields collected so far.
//! The store is process-local: a restart drops every in-flight conversation.

use crate::dialog_state::DialogState;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Collected field values for one session, keyed by field name.
pub type FieldMap = BTreeMap<String, String>;

/// Errors returned by session store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionStoreError {
    /// A continuation fired without a backing session. This is an internal
    /// invariant violation, not a user mistake.
    #[error("no active session for chat '{0}'")]
    NoActiveSession(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// One chat's conversation session: the armed state and collected fields.
pub struct DialogSession {
    pub state: DialogState,
    pub fields: FieldMap,
}

/// Mutex-guarded map of chat id to session. Safe for concurrent access
/// across distinct chats; callers serialize per chat at the dispatch layer.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, DialogSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, DialogSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the armed state for `chat_id`, `Idle` when no session exists.
    pub fn state(&self, chat_id: &str) -> DialogState {
        self.sessions()
            .get(chat_id)
            .map(|session| session.state)
            .unwrap_or_default()
    }

    /// Installs a fresh session in `state` with empty fields, discarding any
    /// stale session for the chat (last start wins).
    pub fn begin(&self, chat_id: &str, state: DialogState) {
        self.sessions().insert(
            chat_id.to_string(),
            DialogSession {
                state,
                fields: FieldMap::new(),
            },
        );
    }

    /// Records a collected field on the active session.
    pub fn set_field(
        &self,
        chat_id: &str,
        name: &str,
        value: String,
    ) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions();
        let session = sessions
            .get_mut(chat_id)
            .ok_or_else(|| SessionStoreError::NoActiveSession(chat_id.to_string()))?;
        session.fields.insert(name.to_string(), value);
        Ok(())
    }

    /// Returns a snapshot of the active session's fields.
    pub fn fields(&self, chat_id: &str) -> Result<FieldMap, SessionStoreError> {
        self.sessions()
            .get(chat_id)
            .map(|session| session.fields.clone())
            .ok_or_else(|| SessionStoreError::NoActiveSession(chat_id.to_string()))
    }

    /// Moves the active session to `state`, keeping its collected fields.
    pub fn advance(&self, chat_id: &str, state: DialogState) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions();
        let session = sessions
            .get_mut(chat_id)
            .ok_or_else(|| SessionStoreError::NoActiveSession(chat_id.to_string()))?;
        session.state = state;
        Ok(())
    }

    /// Removes the session for `chat_id`; idempotent. Returns the removed
    /// session so callers can log what was discarded.
    pub fn end(&self, chat_id: &str) -> Option<DialogSession> {
        self.sessions().remove(chat_id)
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_state_defaults_to_idle() {
        let store = SessionStore::new();
        assert_eq!(store.state("chat-1"), DialogState::Idle);
        assert_eq!(store.active_session_count(), 0);
    }

    #[test]
    fn unit_begin_discards_stale_session() {
        let store = SessionStore::new();
        store.begin("chat-1", DialogState::AwaitingProfile);
        store
            .set_field("chat-1", "first_name", "Anna".to_string())
            .expect("set");

        store.begin("chat-1", DialogState::AwaitingProfile);
        assert!(store.fields("chat-1").expect("fields").is_empty());
        assert_eq!(store.active_session_count(), 1);
    }

    #[test]
    fn unit_set_field_requires_active_session() {
        let store = SessionStore::new();
        let error = store
            .set_field("chat-1", "first_name", "Anna".to_string())
            .expect_err("must fail");
        assert_eq!(
            error,
            SessionStoreError::NoActiveSession("chat-1".to_string())
        );
    }

    #[test]
    fn unit_fields_requires_active_session() {
        let store = SessionStore::new();
        let error = store.fields("chat-9").expect_err("must fail");
        assert_eq!(
            error,
            SessionStoreError::NoActiveSession("chat-9".to_string())
        );
    }

    #[test]
    fn unit_advance_keeps_collected_fields() {
        let store = SessionStore::new();
        store.begin("chat-1", DialogState::AwaitingProfile);
        store
            .set_field("chat-1", "first_name", "Anna".to_string())
            .expect("set");
        store
            .advance("chat-1", DialogState::AwaitingPassword)
            .expect("advance");

        assert_eq!(store.state("chat-1"), DialogState::AwaitingPassword);
        let fields = store.fields("chat-1").expect("fields");
        assert_eq!(fields.get("first_name").map(String::as_str), Some("Anna"));
    }

    #[test]
    fn unit_end_is_idempotent() {
        let store = SessionStore::new();
        store.begin("chat-1", DialogState::AwaitingDeleteNumber);
        let removed = store.end("chat-1").expect("removed");
        assert_eq!(removed.state, DialogState::AwaitingDeleteNumber);
        assert!(store.end("chat-1").is_none());
        assert_eq!(store.state("chat-1"), DialogState::Idle);
    }

    #[test]
    fn unit_sessions_are_independent_across_chats() {
        let store = SessionStore::new();
        store.begin("chat-1", DialogState::AwaitingProfile);
        store.begin("chat-2", DialogState::AwaitingDeleteNumber);

        store.end("chat-1");
        assert_eq!(store.state("chat-1"), DialogState::Idle);
        assert_eq!(store.state("chat-2"), DialogState::AwaitingDeleteNumber);
    }
}
