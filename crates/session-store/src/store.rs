//! Session Store Implementation

use crate::record::{SessionRecord, SessionSnapshot};
use crate::StoreError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// In-memory store mapping session ids to their debounce records.
///
/// The outer map is read-mostly; each record has its own `Mutex` so that
/// concurrent frames for the same session are serialized (at most one
/// in-flight mutation per key) without blocking other sessions. Callers
/// must not hold a record lock across an await point.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionRecord>>>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        info!("Creating in-memory session store");
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the record for `session_id`, creating a zero-initialized one
    /// on first reference. Fails only on an empty key.
    pub async fn get_or_create(
        &self,
        session_id: &str,
    ) -> Result<Arc<Mutex<SessionRecord>>, StoreError> {
        if session_id.is_empty() {
            return Err(StoreError::EmptySessionId);
        }

        // Fast path: session already exists
        {
            let sessions = self.sessions.read().await;
            if let Some(record) = sessions.get(session_id) {
                return Ok(Arc::clone(record));
            }
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock; another task may have created it
        let record = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, "Creating new session record");
                Arc::new(Mutex::new(SessionRecord::default()))
            });
        Ok(Arc::clone(record))
    }

    /// Reset a session to its initial state.
    ///
    /// Total and idempotent: resetting an unknown session creates it in the
    /// reset state.
    pub async fn reset(&self, session_id: &str) -> Result<(), StoreError> {
        let record = self.get_or_create(session_id).await?;
        let mut record = record.lock().await;
        record.reset();
        debug!(session_id, "Session reset");
        Ok(())
    }

    /// Read-only snapshot of a session's current state, `None` if the
    /// session has never been referenced. Never mutates the store.
    pub async fn status(&self, session_id: &str) -> Option<SessionSnapshot> {
        let record = {
            let sessions = self.sessions.read().await;
            Arc::clone(sessions.get(session_id)?)
        };
        let record = record.lock().await;
        Some(record.snapshot())
    }

    /// Number of sessions currently tracked
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop all sessions (test/operator lifecycle)
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
