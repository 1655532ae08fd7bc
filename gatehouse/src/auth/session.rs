//! Server-side session management.
//!
//! Sessions are records in a process-local map keyed by an unguessable
//! token. A token is in exactly one of three states: absent (anonymous
//! caller), valid (resolves to a live record), or invalidated (destroyed or
//! expired; no longer resolves). Each record also carries the anti-forgery
//! token for that session, so destroying a session necessarily invalidates
//! its anti-forgery token as well.
//!
//! All operations are total: unknown or malformed tokens resolve to `None`
//! and destroy is an idempotent no-op, so races between concurrent requests
//! for the same client (e.g. a double-submitted logout) degrade safely.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::auth::password::generate_token;
use crate::types::{Identity, abbrev_uuid};

/// A freshly created session, as handed back to the sign-in flow.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub csrf_token: String,
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct SessionRecord {
    identity: Identity,
    csrf_token: String,
    created_at: DateTime<Utc>,
    rotated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Creates, resolves, destroys, and rotates sessions.
///
/// Constructed once at boot and shared by handle; no global state.
pub struct SessionManager {
    ttl: chrono::Duration,
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(8)),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session for a verified identity.
    ///
    /// The token is freshly generated: a pre-login token can never become a
    /// post-login token. An anti-forgery token is issued alongside it.
    pub fn create(&self, identity: Identity) -> Session {
        let now = Utc::now();
        let token = generate_token();
        let csrf_token = generate_token();
        let record = SessionRecord {
            identity: identity.clone(),
            csrf_token: csrf_token.clone(),
            created_at: now,
            rotated_at: now,
            expires_at: now + self.ttl,
        };

        self.records.write().insert(token.clone(), record);
        debug!(user = %abbrev_uuid(&identity.id), "session created");

        Session {
            token,
            csrf_token,
            identity,
            created_at: now,
            expires_at: now + self.ttl,
        }
    }

    /// Resolve a token to its bound identity.
    ///
    /// Unknown, malformed, destroyed, and expired tokens are all simply
    /// `None`. Expired records are pruned when observed.
    pub fn resolve(&self, token: &str) -> Option<Identity> {
        let now = Utc::now();
        let mut expired = false;
        let out = {
            let records = self.records.read();
            match records.get(token) {
                Some(record) if record.expires_at > now => Some(record.identity.clone()),
                Some(_) => {
                    expired = true;
                    None
                }
                None => None,
            }
        };
        if expired {
            self.records.write().remove(token);
        }
        out
    }

    /// Invalidate a session. Idempotent: unknown tokens are a no-op.
    pub fn destroy(&self, token: &str) {
        if let Some(record) = self.records.write().remove(token) {
            debug!(user = %abbrev_uuid(&record.identity.id), "session destroyed");
        }
    }

    /// Issue a fresh anti-forgery token for the session, invalidating the
    /// previous one. Returns `None` if the token has no live session.
    pub fn rotate_csrf(&self, token: &str) -> Option<String> {
        let mut records = self.records.write();
        let record = records.get_mut(token)?;
        let fresh = generate_token();
        record.csrf_token = fresh.clone();
        record.rotated_at = Utc::now();
        Some(fresh)
    }

    /// Current anti-forgery token for the session, for the rendering layer
    /// to embed in forms.
    pub fn csrf_token(&self, token: &str) -> Option<String> {
        self.records.read().get(token).map(|record| record.csrf_token.clone())
    }

    /// Constant-time check of a presented anti-forgery token against the
    /// session's current one. `false` for unknown sessions.
    pub fn verify_csrf(&self, token: &str, presented: &str) -> bool {
        let records = self.records.read();
        match records.get(token) {
            Some(record) => record.csrf_token.as_bytes().ct_eq(presented.as_bytes()).into(),
            None => false,
        }
    }

    /// Number of live records (expired-but-unpruned included).
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use uuid::Uuid;

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            identifier: "ada@example.com".to_string(),
            display_name: Some("Ada".to_string()),
            role: Role::Standard,
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new(Duration::from_secs(3600))
    }

    #[test]
    fn test_create_then_resolve() {
        let sessions = manager();
        let identity = identity();

        let session = sessions.create(identity.clone());
        assert_eq!(sessions.resolve(&session.token), Some(identity));
    }

    #[test]
    fn test_destroy_then_resolve_is_none() {
        let sessions = manager();
        let session = sessions.create(identity());

        sessions.destroy(&session.token);
        assert_eq!(sessions.resolve(&session.token), None);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let sessions = manager();
        let session = sessions.create(identity());

        sessions.destroy(&session.token);
        // Second destroy of the same token, and destroy of a token that never
        // existed, must both be silent no-ops.
        sessions.destroy(&session.token);
        sessions.destroy("no-such-token");
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_unknown_and_malformed_tokens_resolve_to_none() {
        let sessions = manager();
        assert_eq!(sessions.resolve("no-such-token"), None);
        assert_eq!(sessions.resolve(""), None);
        assert_eq!(sessions.resolve("!!\u{0}not-base64url\n"), None);
    }

    #[test]
    fn test_expired_session_resolves_to_none_and_is_pruned() {
        let sessions = SessionManager::new(Duration::ZERO);
        let session = sessions.create(identity());

        assert_eq!(sessions.resolve(&session.token), None);
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_tokens_are_unique_per_session() {
        let sessions = manager();
        let a = sessions.create(identity());
        let b = sessions.create(identity());
        assert_ne!(a.token, b.token);
        assert_ne!(a.csrf_token, b.csrf_token);
    }

    #[test]
    fn test_rotate_csrf_invalidates_previous_token() {
        let sessions = manager();
        let session = sessions.create(identity());

        let fresh = sessions.rotate_csrf(&session.token).unwrap();
        assert_ne!(fresh, session.csrf_token);
        assert!(sessions.verify_csrf(&session.token, &fresh));
        assert!(!sessions.verify_csrf(&session.token, &session.csrf_token));
    }

    #[test]
    fn test_rotate_csrf_on_dead_session_is_none() {
        let sessions = manager();
        let session = sessions.create(identity());
        sessions.destroy(&session.token);

        assert_eq!(sessions.rotate_csrf(&session.token), None);
        assert_eq!(sessions.csrf_token(&session.token), None);
        assert!(!sessions.verify_csrf(&session.token, &session.csrf_token));
    }

    #[test]
    fn test_concurrent_resolve_and_destroy() {
        use std::sync::Arc;

        let sessions = Arc::new(manager());
        let session = sessions.create(identity());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let sessions = sessions.clone();
            let token = session.token.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    // Either a full identity or None, never a torn record
                    let _ = sessions.resolve(&token);
                    sessions.destroy(&token);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sessions.resolve(&session.token), None);
    }
}
