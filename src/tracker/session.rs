//! Per-session state
//!
//! Each browser session owns its measure requests and improvement history.
//! Sessions never see each other's data.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use super::history::{History, ImprovementRecord, MeasureRecord};

/// State of one session
#[derive(Debug, Clone)]
pub struct Session {
    pub created_at: DateTime<Utc>,
    measures: Vec<MeasureRecord>,
    history: History,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            measures: Vec::new(),
            history: History::new(),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent recommendation; only this one feeds the survey step
    pub fn latest_measures(&self) -> Option<&MeasureRecord> {
        self.measures.last()
    }

    pub fn record_measures(&mut self, record: MeasureRecord) {
        self.measures.push(record);
    }

    pub fn record_improvement(&mut self, record: ImprovementRecord) {
        self.history.push(record);
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_seen: DateTime<Utc>,
}

/// Registry of live sessions
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Start a new empty session
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let session = Session::new();
        let entry = SessionEntry {
            last_seen: session.created_at,
            session: Arc::new(Mutex::new(session)),
        };
        self.sessions.write().await.insert(id, entry);
        info!("Session {} created", id);
        id
    }

    /// Handle to a session; marks it as active. Lock it for the duration of
    /// one user action.
    pub async fn get(&self, id: &Uuid) -> Option<Arc<Mutex<Session>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_seen = Utc::now();
        Some(entry.session.clone())
    }

    /// Drop sessions not accessed within `max_idle`; returns how many went
    pub async fn cleanup(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen > cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            info!("Expired {} idle sessions", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_measures_is_last_pushed() {
        let mut session = Session::new();
        assert!(session.latest_measures().is_none());

        session.record_measures(MeasureRecord::new(30.0, vec!["a".into()]));
        session.record_measures(MeasureRecord::new(45.0, vec!["b".into(), "c".into()]));

        let latest = session.latest_measures().unwrap();
        assert_eq!(latest.reported_rate, 45.0);
        assert_eq!(latest.measures, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create().await;
        let b = store.create().await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);

        {
            let handle = store.get(&a).await.unwrap();
            let mut session = handle.lock().await;
            session.record_measures(MeasureRecord::new(10.0, vec!["only in a".into()]));
        }

        let handle = store.get(&b).await.unwrap();
        assert!(handle.lock().await.latest_measures().is_none());
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);
        assert!(store.get(&Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expires_idle_sessions() {
        let store = SessionStore::new();
        for _ in 0..50 {
            store.create().await;
        }
        assert_eq!(store.cleanup(Duration::hours(1)).await, 0);
        assert_eq!(store.len().await, 50);

        assert_eq!(store.cleanup(Duration::zero()).await, 50);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_access_keeps_session_alive() {
        let store = SessionStore::new();
        let idle = store.create().await;
        let active = store.create().await;

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(store.get(&active).await.is_some());

        assert_eq!(store.cleanup(Duration::milliseconds(20)).await, 1);
        assert!(store.get(&idle).await.is_none());
        assert!(store.get(&active).await.is_some());
    }
}
