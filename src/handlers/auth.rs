use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;

use crate::error::ViharaError;
use crate::gate::{LogoutReason, Role};
use crate::handlers::{SESSION_COOKIE, session_token};
use crate::router::ViharaState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub secret: String,
    pub role: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /login -> opens a session and sets the private session cookie.
pub async fn login(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ViharaError> {
    // An unknown role reads the same as a bad username or password.
    let role = Role::parse(&req.role).ok_or(ViharaError::InvalidCredentials)?;
    let session = state.gate.login(&req.identifier, &req.secret, role).await?;
    let jar = jar.add(session_cookie(session.token.to_string()));
    Ok((
        jar,
        Json(json!({
            "actor_id": session.actor_id,
            "role": session.role,
            "display_name": session.display_name,
        })),
    ))
}

/// POST /logout -> destroys the session. Safe to call without one, and the
/// body is optional: no reason means a manual logout.
pub async fn logout(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    body: Bytes,
) -> impl IntoResponse {
    let reason = serde_json::from_slice::<LogoutRequest>(&body)
        .ok()
        .and_then(|r| r.reason)
        .and_then(|s| LogoutReason::parse(&s))
        .unwrap_or(LogoutReason::Manual);
    let farewell = state.gate.logout(session_token(&jar), reason);
    let jar = jar.remove(clear_session_cookie());
    (jar, Json(json!({ "message": farewell })))
}

/// GET /session -> who am I, plus the timeout numbers the client-side
/// countdown needs.
pub async fn session_info(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, ViharaError> {
    let actor = state
        .gate
        .current_actor(session_token(&jar))
        .ok_or(ViharaError::Forbidden)?;
    Ok(Json(json!({
        "actor_id": actor.id,
        "role": actor.role,
        "display_name": actor.display_name,
        "timeout_secs": state.gate.idle_timeout_secs(),
        "warning_lead_secs": state.gate.warning_lead_secs(),
    })))
}

/// POST /session/ping -> resets the inactivity clock. Idempotent.
pub async fn ping(State(state): State<ViharaState>, jar: PrivateCookieJar) -> impl IntoResponse {
    state.gate.extend_session(session_token(&jar));
    Json(json!({ "ok": true }))
}

fn session_cookie(token: String) -> Cookie<'static> {
    // No max-age: the server-side inactivity timeout is authoritative, the
    // cookie itself lives for the browser session.
    Cookie::build(Cookie::new(SESSION_COOKIE.to_string(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
