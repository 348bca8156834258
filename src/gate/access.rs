use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ViharaError;
use crate::gate::password;
use crate::gate::session::{Actor, LogoutReason, Role, Session};
use crate::store::DataStore;

/// Session-backed authentication and role authorization.
///
/// Establishes who is making a request and prevents a route from executing
/// business logic unless the actor holds the required role. Sessions live in
/// an in-process registry keyed by an unguessable token; the store is only
/// consulted to look up credential rows at login (plus the last-login touch).
///
/// Expiry is lazy: an idle-beyond-timeout session is removed at the moment
/// it is next checked, never preemptively.
#[derive(Clone)]
pub struct AccessGate {
    store: DataStore,
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    idle_timeout_secs: u64,
    warning_lead_secs: u64,
}

impl AccessGate {
    pub fn new(store: DataStore, idle_timeout_secs: u64, warning_lead_secs: u64) -> Self {
        Self {
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout_secs,
            warning_lead_secs,
        }
    }

    pub fn idle_timeout_secs(&self) -> u64 {
        self.idle_timeout_secs
    }

    pub fn warning_lead_secs(&self) -> u64 {
        self.warning_lead_secs
    }

    /// Authenticate an actor and open a fresh session whose role is fixed to
    /// the claimed role the lookup was scoped to.
    ///
    /// Unknown identifier, wrong secret, and wrong role all collapse into
    /// `InvalidCredentials`; only a matched actor with a verified secret but
    /// an inactive flag gets the more specific `InactiveAccount`.
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
        claimed_role: Role,
    ) -> Result<Session, ViharaError> {
        let row = self
            .store
            .fetch_one(
                "SELECT id, display_name, credential_hash, is_active \
                 FROM actors WHERE role = ? AND (username = ? OR email = ?)",
                &[
                    claimed_role.as_str().into(),
                    identifier.into(),
                    identifier.into(),
                ],
            )
            .await?;

        let Some(row) = row else {
            return Err(ViharaError::InvalidCredentials);
        };
        let Some(hash) = row.text("credential_hash") else {
            return Err(ViharaError::InvalidCredentials);
        };

        let verified = password::verify_secret(secret, hash).unwrap_or_else(|e| {
            warn!(error = %e, "stored credential hash rejected by verifier");
            false
        });
        if !verified {
            return Err(ViharaError::InvalidCredentials);
        }
        if row.integer("is_active") != Some(1) {
            return Err(ViharaError::InactiveAccount);
        }

        let actor_id = row
            .integer("id")
            .ok_or_else(|| ViharaError::Query("actors row missing id".to_string()))?;
        let display_name = row.text("display_name").unwrap_or(identifier).to_string();

        let now = Utc::now();
        self.store
            .update(
                "actors",
                &[("last_login", now.into())],
                "id = ?",
                &[actor_id.into()],
            )
            .await?;

        let session = Session {
            token: Uuid::new_v4(),
            actor_id,
            role: claimed_role,
            display_name,
            issued_at: now,
            last_activity_at: now,
        };
        self.write_sessions()
            .insert(session.token, session.clone());

        info!(actor_id, role = claimed_role.as_str(), "session opened");
        Ok(session)
    }

    /// The actor bound to the active session, or `None` if unauthenticated
    /// or expired. Callers decide what "no actor" means for their route.
    pub fn current_actor(&self, token: Option<Uuid>) -> Option<Actor> {
        self.live_session(token?).map(|s| s.actor())
    }

    /// Fail-closed role check: denies on missing session, expired session,
    /// or any role other than an exact match. Called at the top of every
    /// protected route before any read or write.
    pub fn require_role(&self, token: Option<Uuid>, role: Role) -> Result<Actor, ViharaError> {
        let actor = self
            .current_actor(token)
            .ok_or(ViharaError::Forbidden)?;
        if actor.role != role {
            return Err(ViharaError::Forbidden);
        }
        Ok(actor)
    }

    /// Destroy the session. Idempotent: a second call against an already
    /// destroyed session is a no-op. Returns the farewell message selected
    /// by the reason.
    pub fn logout(&self, token: Option<Uuid>, reason: LogoutReason) -> &'static str {
        if let Some(token) = token
            && self.write_sessions().remove(&token).is_some()
        {
            info!(reason = ?reason, "session destroyed");
        }
        reason.farewell()
    }

    /// Reset the inactivity clock. Idempotent; called by a lightweight
    /// periodic client-side ping while the user is active.
    pub fn extend_session(&self, token: Option<Uuid>) {
        if let Some(token) = token {
            let _ = self.live_session(token);
        }
    }

    /// Look up a session, expiring it lazily if it has idled past the
    /// timeout, and touching its activity clock otherwise.
    fn live_session(&self, token: Uuid) -> Option<Session> {
        let now = Utc::now();
        let timeout = Duration::seconds(self.idle_timeout_secs as i64);
        let mut sessions = self.write_sessions();
        match sessions.get_mut(&token) {
            Some(session) if now - session.last_activity_at > timeout => {
                sessions.remove(&token);
                None
            }
            Some(session) => {
                session.last_activity_at = now;
                Some(session.clone())
            }
            None => None,
        }
    }

    fn write_sessions(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
