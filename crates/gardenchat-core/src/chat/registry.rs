//! Live chat sessions keyed by id.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use gardenchat_types::chat::SettingsPatch;
use gardenchat_types::error::ChatError;

use super::session::{ChatSession, SessionContext};

/// Handle to one session. The mutex serializes turns within a session.
pub type SessionHandle = Arc<Mutex<ChatSession>>;

/// Concurrent map of live sessions.
///
/// Different sessions proceed in parallel; messages to the same session
/// are processed one at a time.
pub struct SessionRegistry {
    context: Arc<SessionContext>,
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self {
            context,
            sessions: DashMap::new(),
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Start a session and register it.
    pub fn create(&self, patch: &SettingsPatch) -> Result<SessionHandle, ChatError> {
        let session = ChatSession::start(Arc::clone(&self.context), patch)?;
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    pub fn get(&self, id: &Uuid) -> Result<SessionHandle, ChatError> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ChatError::SessionNotFound)
    }

    /// End a session. Its history is discarded.
    pub fn remove(&self, id: &Uuid) -> Result<(), ChatError> {
        self.sessions
            .remove(id)
            .map(|_| info!(session_id = %id, "Chat session ended"))
            .ok_or(ChatError::SessionNotFound)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
