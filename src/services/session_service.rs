use crate::error::{Error, Result};
use crate::models::quiz_session::QuizSession;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

struct StoredSession {
    session: QuizSession,
    last_access: Instant,
}

type SessionMap = HashMap<Uuid, StoredSession>;

/// In-memory session store. Each action takes the lock for its own
/// duration, so actions on one session apply one at a time.
///
/// Sessions idle for longer than the TTL are dropped the next time the
/// store is touched. Any access, reads included, counts as activity.
#[derive(Clone, Default)]
pub struct SessionService {
    sessions: Arc<Mutex<SessionMap>>,
    ttl: Option<Duration>,
}

impl SessionService {
    /// `None` keeps sessions until they are deleted.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    pub fn create(&self) -> Result<QuizSession> {
        let session = QuizSession::new();
        let mut sessions = self.lock()?;
        sessions.insert(
            session.id,
            StoredSession {
                session: session.clone(),
                last_access: Instant::now(),
            },
        );
        tracing::info!(session_id = %session.id, active = sessions.len(), "Session created");
        Ok(session)
    }

    pub fn get(&self, id: Uuid) -> Result<QuizSession> {
        let mut sessions = self.lock()?;
        let stored = Self::entry(&mut sessions, id)?;
        Ok(stored.session.clone())
    }

    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let removed = self.lock()?.remove(&id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session deleted");
        }
        Ok(removed)
    }

    /// Runs `f` against the stored session. Nothing is written back on its
    /// own; `f` mutates in place.
    pub fn with_session<T>(&self, id: Uuid, f: impl FnOnce(&mut QuizSession) -> Result<T>) -> Result<T> {
        let mut sessions = self.lock()?;
        let stored = Self::entry(&mut sessions, id)?;
        f(&mut stored.session)
    }

    pub fn active_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn entry(sessions: &mut SessionMap, id: Uuid) -> Result<&mut StoredSession> {
        let stored = sessions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", id)))?;
        stored.last_access = Instant::now();
        Ok(stored)
    }

    /// Locks the store and evicts idle sessions.
    fn lock(&self) -> Result<MutexGuard<'_, SessionMap>> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| Error::Internal("Session store lock poisoned".to_string()))?;

        if let Some(ttl) = self.ttl {
            let before = sessions.len();
            sessions.retain(|_, stored| stored.last_access.elapsed() <= ttl);
            let expired = before - sessions.len();
            if expired > 0 {
                tracing::info!(expired, ttl_secs = ttl.as_secs(), "Expired idle sessions");
            }
        }
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_sessions_expire_and_active_ones_survive() {
        let store = SessionService::new(Some(Duration::from_millis(200)));
        let idle = store.create().unwrap();
        let busy = store.create().unwrap();

        for _ in 0..6 {
            std::thread::sleep(Duration::from_millis(50));
            store.get(busy.id).unwrap();
        }

        assert!(matches!(store.get(idle.id), Err(Error::NotFound(_))));
        assert!(store.get(busy.id).is_ok());
        assert_eq!(store.active_count().unwrap(), 1);
    }

    #[test]
    fn without_ttl_sessions_stay_until_deleted() {
        let store = SessionService::new(None);
        let session = store.create().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(store.get(session.id).is_ok());
        assert!(store.delete(session.id).unwrap());
        assert!(!store.delete(session.id).unwrap());
    }
}
