//! Shared types for the API layer.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::crypto::{generate_token, hash_token};
use crate::models::*;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus the login session store.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub sessions: Arc<SessionStore>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        let sessions = Arc::new(SessionStore::new(core.config.session_ttl));
        Self { core, sessions }
    }
}

// ═══════════════════════════════════════════════════════════
// Auth context: injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated caller, injected into request extensions by the auth
/// middleware after the bearer token resolves to a live session.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub profile: Profile,
    /// Bearer token as presented, so logout can revoke it.
    pub token: String,
}

impl AuthContext {
    pub fn patient(&self) -> Result<&PatientProfile, ApiError> {
        self.profile
            .as_patient()
            .ok_or(ApiError::WrongRole(Role::Patient))
    }

    pub fn doctor(&self) -> Result<&DoctorProfile, ApiError> {
        self.profile
            .as_doctor()
            .ok_or(ApiError::WrongRole(Role::Doctor))
    }

    pub fn insurer(&self) -> Result<&InsuranceProfile, ApiError> {
        self.profile
            .as_insurance()
            .ok_or(ApiError::WrongRole(Role::Insurance))
    }
}

// ═══════════════════════════════════════════════════════════
// Session store: opaque bearer tokens with sliding expiry
// ═══════════════════════════════════════════════════════════

#[derive(Debug)]
struct SessionEntry {
    user_id: Uuid,
    last_seen: Instant,
}

/// In-memory login sessions keyed by the SHA-256 of the bearer token.
/// Sessions expire after `ttl` without use; every resolve extends them.
/// The raw token is never stored.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Open a session for `user_id` and return its bearer token.
    pub fn create(&self, user_id: Uuid) -> String {
        let token = generate_token();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        // Drop expired sessions while holding the lock anyway.
        let ttl = self.ttl;
        sessions.retain(|_, s| s.last_seen.elapsed() < ttl);
        sessions.insert(
            hash_token(&token),
            SessionEntry {
                user_id,
                last_seen: Instant::now(),
            },
        );
        token
    }

    /// User behind `token`, if the session is still live.
    pub fn resolve(&self, token: &str) -> Option<Uuid> {
        let key = hash_token(token);
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let entry = sessions.get_mut(&key)?;
        if entry.last_seen.elapsed() >= self.ttl {
            sessions.remove(&key);
            return None;
        }
        entry.last_seen = Instant::now();
        Some(entry.user_id)
    }

    /// End the session behind `token`. Returns whether one existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&hash_token(token))
            .is_some()
    }

    pub fn active_count(&self) -> usize {
        let ttl = self.ttl;
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|s| s.last_seen.elapsed() < ttl)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_roundtrip_and_revoke() {
        let store = SessionStore::new(Duration::from_secs(60));
        let user = Uuid::new_v4();
        let token = store.create(user);

        assert_eq!(store.resolve(&token), Some(user));
        assert_eq!(store.resolve("not-a-token"), None);
        assert_eq!(store.active_count(), 1);

        assert!(store.revoke(&token));
        assert!(!store.revoke(&token));
        assert_eq!(store.resolve(&token), None);
    }

    #[test]
    fn expired_session_is_dropped() {
        let store = SessionStore::new(Duration::ZERO);
        let token = store.create(Uuid::new_v4());
        assert_eq!(store.resolve(&token), None);
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn tokens_are_distinct_per_login() {
        let store = SessionStore::new(Duration::from_secs(60));
        let user = Uuid::new_v4();
        let a = store.create(user);
        let b = store.create(user);
        assert_ne!(a, b);
        store.revoke(&a);
        assert_eq!(store.resolve(&b), Some(user));
    }

    #[test]
    fn role_accessors_reject_other_roles() {
        let user = User {
            id: Uuid::new_v4(),
            email: "i@example.com".into(),
            credential_hash: String::new(),
            role: Role::Insurance,
            created_at: chrono::Local::now().naive_local(),
        };
        let ctx = AuthContext {
            profile: Profile::Insurance(InsuranceProfile {
                id: Uuid::new_v4(),
                user_id: user.id,
                company_name: "Acme".into(),
                phone: None,
                address: None,
                pincode: None,
            }),
            user,
            token: "t".into(),
        };
        assert!(ctx.insurer().is_ok());
        assert!(matches!(ctx.patient(), Err(ApiError::WrongRole(Role::Patient))));
        assert!(matches!(ctx.doctor(), Err(ApiError::WrongRole(Role::Doctor))));
    }
}
