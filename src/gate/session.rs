use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four roles the application segments access by. Checks are exact-match
/// only: admin does not implicitly satisfy a doctor-required check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Monk,
    Donator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Monk => "monk",
            Role::Donator => "donator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "doctor" => Some(Role::Doctor),
            "monk" => Some(Role::Monk),
            "donator" => Some(Role::Donator),
            _ => None,
        }
    }
}

/// The identity bound to a live session, as exposed to business logic for
/// auditing. The credential hash never leaves the gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
    pub display_name: String,
}

/// Server-side proof that an actor is authenticated. The role is fixed at
/// login from the claimed role that the credential lookup was scoped to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Uuid,
    pub actor_id: i64,
    pub role: Role,
    pub display_name: String,
    pub issued_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.actor_id,
            role: self.role,
            display_name: self.display_name.clone(),
        }
    }
}

/// Why a session was destroyed. Only selects the farewell message; has no
/// effect on stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    Manual,
    Timeout,
    Security,
}

impl LogoutReason {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(LogoutReason::Manual),
            "timeout" => Some(LogoutReason::Timeout),
            "security" => Some(LogoutReason::Security),
            _ => None,
        }
    }

    pub fn farewell(&self) -> &'static str {
        match self {
            LogoutReason::Manual => "You have been logged out.",
            LogoutReason::Timeout => "Your session expired due to inactivity.",
            LogoutReason::Security => "You have been logged out for security reasons.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_parse() {
        for role in [Role::Admin, Role::Doctor, Role::Monk, Role::Donator] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }
}
