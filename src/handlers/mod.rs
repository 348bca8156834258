//! Route handlers. Every protected handler calls the gate before touching
//! the store, and every write wraps its business row, any counter
//! compensation, and the audit row in one transaction.

pub mod appointments;
pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod doctors;
pub mod donations;
pub mod expenses;
pub mod monks;
pub mod records;
pub mod report;
pub mod rooms;

use axum_extra::extract::cookie::PrivateCookieJar;
use uuid::Uuid;

use crate::error::ViharaError;
use crate::gate::{AccessGate, Actor, Role};
use crate::store::DataStore;

pub(crate) const SESSION_COOKIE: &str = "vihara_session";

pub(crate) fn session_token(jar: &PrivateCookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
}

/// Route-layer check for pages that several roles may open; the caller then
/// scopes its queries to the actor it gets back. Fails closed the same way
/// `require_role` does.
pub(crate) fn require_any(
    gate: &AccessGate,
    token: Option<Uuid>,
    roles: &[Role],
) -> Result<Actor, ViharaError> {
    let actor = gate.current_actor(token).ok_or(ViharaError::Forbidden)?;
    if roles.contains(&actor.role) {
        Ok(actor)
    } else {
        Err(ViharaError::Forbidden)
    }
}

/// The doctor row belonging to a doctor-role actor, for scoping queries to
/// "my schedule" / "my records".
pub(crate) async fn doctor_profile_id(
    store: &DataStore,
    actor: &Actor,
) -> Result<i64, ViharaError> {
    store
        .fetch_one(
            "SELECT id FROM doctors WHERE actor_id = ?",
            &[actor.id.into()],
        )
        .await?
        .and_then(|r| r.integer("id"))
        .ok_or_else(|| {
            ViharaError::Invalid("no doctor profile is linked to this account".to_string())
        })
}

/// The monk row belonging to a monk-role actor.
pub(crate) async fn monk_profile_id(store: &DataStore, actor: &Actor) -> Result<i64, ViharaError> {
    store
        .fetch_one(
            "SELECT id FROM monks WHERE actor_id = ?",
            &[actor.id.into()],
        )
        .await?
        .and_then(|r| r.integer("id"))
        .ok_or_else(|| {
            ViharaError::Invalid("no resident profile is linked to this account".to_string())
        })
}
