//! Authentication and role authorization.
//!
//! Layout:
//! - `session.rs`: roles, actors, session records, logout reasons
//! - `password.rs`: Argon2id hashing and verification
//! - `access.rs`: the gate every protected route goes through first

pub mod access;
pub mod password;
pub mod session;

pub use access::AccessGate;
pub use session::{Actor, LogoutReason, Role, Session};
