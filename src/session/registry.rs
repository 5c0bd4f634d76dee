//! Per-login session context.
//!
//! A session is created at login and dropped at logout, when the same
//! client logs in as someone else, or once it expires together with its
//! token. It caches the profile and holds the meal entry waiting for review.

use std::collections::HashMap;
use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{InputMode, TimeOffset, UserId, UserProfile};
use crate::estimation::MealEstimate;
use crate::store::{LogStore, StoreError};

/// Estimated meal waiting for the user to save or cancel it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMeal {
    pub estimate: MealEstimate,
    pub mode: InputMode,
    pub offset: TimeOffset,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LogStage {
    #[default]
    Input,
    Review(PendingMeal),
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub user_id: UserId,
    pub profile: Option<UserProfile>,
    pub stage: LogStage,
    pub started_at: OffsetDateTime,
    /// Also the `exp` of the session's token.
    pub expires_at: OffsetDateTime,
}

impl Session {
    fn new(user_id: UserId, profile: Option<UserProfile>, ttl: Duration) -> Self {
        let started_at = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            user_id,
            profile,
            stage: LogStage::Input,
            started_at,
            expires_at: started_at + ttl,
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Reloads the profile from the store so the cache sees factor updates
    /// made through other sessions.
    pub async fn refresh_profile(
        &mut self,
        store: &dyn LogStore,
    ) -> Result<Option<&UserProfile>, StoreError> {
        self.profile = store.find_profile(&self.user_id).await?;
        Ok(self.profile.as_ref())
    }

    pub fn pending(&self) -> Option<&PendingMeal> {
        match &self.stage {
            LogStage::Review(pending) => Some(pending),
            LogStage::Input => None,
        }
    }

    pub fn begin_review(&mut self, pending: PendingMeal) {
        self.stage = LogStage::Review(pending);
    }

    /// Drops any pending entry. Returns whether one was pending.
    pub fn reset_stage(&mut self) -> bool {
        matches!(std::mem::take(&mut self.stage), LogStage::Review(_))
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Opens a session and drops any that have expired.
    pub async fn open(&self, user_id: UserId, profile: Option<UserProfile>) -> (Uuid, SessionHandle) {
        let session = Session::new(user_id, profile, self.ttl);
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));

        let mut sessions = self.sessions.write().await;
        let now = OffsetDateTime::now_utc();
        let mut expired = Vec::new();
        for (sid, h) in sessions.iter() {
            // A session locked by a running request is in use; skip it.
            if let Ok(s) = h.try_lock() {
                if s.is_expired(now) {
                    expired.push(*sid);
                }
            }
        }
        for sid in &expired {
            sessions.remove(sid);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "expired sessions removed");
        }

        sessions.insert(id, handle.clone());
        (id, handle)
    }

    /// Live session by id. An expired session is removed and not returned.
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let handle = self.sessions.read().await.get(&id).cloned()?;
        if handle.lock().await.is_expired(OffsetDateTime::now_utc()) {
            self.sessions.write().await.remove(&id);
            return None;
        }
        Some(handle)
    }

    /// Removes the session. Returns whether it existed.
    pub async fn close(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
