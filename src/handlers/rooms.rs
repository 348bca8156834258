use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::audit::{self, AuditAction};
use crate::error::ViharaError;
use crate::gate::Role;
use crate::handlers::session_token;
use crate::router::ViharaState;
use crate::store::Row;

#[derive(Debug, Deserialize)]
pub struct RoomPayload {
    pub room_no: String,
    pub capacity: i64,
}

/// GET /rooms — admin.
pub async fn list(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
) -> Result<Json<Vec<Row>>, ViharaError> {
    state.gate.require_role(session_token(&jar), Role::Admin)?;
    let rows = state
        .store
        .fetch_all(
            "SELECT id, room_no, capacity, current_occupancy FROM rooms ORDER BY room_no",
            &[],
        )
        .await?;
    Ok(Json(rows))
}

/// POST /rooms — admin.
pub async fn create(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Json(payload): Json<RoomPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let room_no = payload.room_no.trim();
    if room_no.is_empty() {
        return Err(ViharaError::Invalid("room_no is required".to_string()));
    }
    if payload.capacity < 1 {
        return Err(ViharaError::Invalid("capacity must be at least 1".to_string()));
    }
    let duplicate = state
        .store
        .fetch_one("SELECT id FROM rooms WHERE room_no = ?", &[room_no.into()])
        .await?;
    if duplicate.is_some() {
        return Err(ViharaError::Invalid(format!(
            "room {room_no} already exists"
        )));
    }

    let mut tx = state.store.begin().await?;
    let id = tx
        .insert(
            "rooms",
            &[
                ("room_no", room_no.into()),
                ("capacity", payload.capacity.into()),
                ("current_occupancy", 0i64.into()),
            ],
        )
        .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Create,
        "rooms",
        id,
        None,
        Some(json!({ "room_no": room_no, "capacity": payload.capacity })),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

/// PUT /rooms/{id} — admin. Capacity cannot drop below the current
/// occupancy the counter reports.
pub async fn update(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Json(payload): Json<RoomPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let Some(existing) = state
        .store
        .fetch_one(
            "SELECT id, room_no, capacity, current_occupancy FROM rooms WHERE id = ?",
            &[id.into()],
        )
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let room_no = payload.room_no.trim();
    if room_no.is_empty() {
        return Err(ViharaError::Invalid("room_no is required".to_string()));
    }
    if payload.capacity < existing.integer("current_occupancy").unwrap_or(0) {
        return Err(ViharaError::Invalid(
            "capacity cannot be lower than current occupancy".to_string(),
        ));
    }

    let mut tx = state.store.begin().await?;
    tx.update(
        "rooms",
        &[
            ("room_no", room_no.into()),
            ("capacity", payload.capacity.into()),
        ],
        "id = ?",
        &[id.into()],
    )
    .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Update,
        "rooms",
        id,
        Some(serde_json::to_value(&existing)?),
        Some(json!({ "room_no": room_no, "capacity": payload.capacity })),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "updated": true })).into_response())
}

/// DELETE /rooms/{id} — admin. Refused while occupied.
pub async fn remove(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let Some(existing) = state
        .store
        .fetch_one(
            "SELECT id, room_no, capacity, current_occupancy FROM rooms WHERE id = ?",
            &[id.into()],
        )
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    if existing.integer("current_occupancy").unwrap_or(0) > 0 {
        return Err(ViharaError::Invalid(
            "room is occupied; move its residents first".to_string(),
        ));
    }

    let mut tx = state.store.begin().await?;
    tx.delete("rooms", "id = ?", &[id.into()]).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Delete,
        "rooms",
        id,
        Some(serde_json::to_value(&existing)?),
        None,
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "deleted": true })).into_response())
}
