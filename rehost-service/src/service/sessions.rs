//! In-memory login sessions.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Session tokens handed out after a successful login
pub struct SessionStore {
    sessions: DashMap<String, Instant>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Start a new session and return its token. Expired sessions are swept
    /// first, so abandoned logins do not accumulate.
    pub fn create(&self) -> String {
        let now = Instant::now();
        self.sessions.retain(|_, expires_at| *expires_at > now);

        let token = Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), now + self.ttl);
        debug!(active = self.sessions.len(), "Session created");
        token
    }

    /// Whether `token` names a live session. Expired sessions are dropped.
    pub fn is_valid(&self, token: &str) -> bool {
        let expired = match self.sessions.get(token) {
            Some(expires_at) => *expires_at <= Instant::now(),
            None => return false,
        };

        if expired {
            self.sessions.remove(token);
            return false;
        }
        true
    }

    pub fn remove(&self, token: &str) {
        self.sessions.remove(token);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SESSION_TTL)
    }
}
