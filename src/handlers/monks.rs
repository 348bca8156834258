use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::audit::{self, AuditAction};
use crate::error::ViharaError;
use crate::gate::Role;
use crate::handlers::session_token;
use crate::router::ViharaState;
use crate::store::{Row, Tx, Value};

#[derive(Debug, Deserialize)]
pub struct MonkPayload {
    pub full_name: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub admitted_on: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonkFilter {
    pub search: Option<String>,
    pub room_id: Option<i64>,
}

const MONK_COLUMNS: &str = "id, actor_id, full_name, date_of_birth, room_id, admitted_on, notes";

/// GET /monks — admin. The WHERE clause is assembled from a fixed set of
/// code-controlled fragments; the filter values are always bound.
pub async fn list(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Query(filter): Query<MonkFilter>,
) -> Result<Json<Vec<Row>>, ViharaError> {
    state.gate.require_role(session_token(&jar), Role::Admin)?;

    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    if let Some(q) = filter.search.as_deref() {
        clauses.push("full_name LIKE ?");
        params.push(format!("%{q}%").into());
    }
    if let Some(room_id) = filter.room_id {
        clauses.push("room_id = ?");
        params.push(room_id.into());
    }
    let mut sql = format!("SELECT {MONK_COLUMNS} FROM monks");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY full_name");

    Ok(Json(state.store.fetch_all(&sql, &params).await?))
}

/// GET /monks/{id} — admin.
pub async fn get(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, ViharaError> {
    state.gate.require_role(session_token(&jar), Role::Admin)?;
    let row = state
        .store
        .fetch_one(
            &format!("SELECT {MONK_COLUMNS} FROM monks WHERE id = ?"),
            &[id.into()],
        )
        .await?;
    match row {
        Some(row) => Ok(Json(row).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// POST /monks — admin. Assigning a room increments its occupancy counter in
/// the same transaction as the monk row.
pub async fn create(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Json(payload): Json<MonkPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let full_name = payload.full_name.trim();
    if full_name.is_empty() {
        return Err(ViharaError::Invalid("full_name is required".to_string()));
    }

    let mut tx = state.store.begin().await?;
    let id = tx
        .insert(
            "monks",
            &[
                ("full_name", full_name.into()),
                ("date_of_birth", payload.date_of_birth.clone().into()),
                ("room_id", payload.room_id.into()),
                ("admitted_on", payload.admitted_on.clone().into()),
                ("notes", payload.notes.clone().into()),
            ],
        )
        .await?;
    if let Some(room_id) = payload.room_id {
        adjust_occupancy(&mut tx, room_id, 1).await?;
    }
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Create,
        "monks",
        id,
        None,
        Some(json!({
            "full_name": full_name,
            "date_of_birth": payload.date_of_birth,
            "room_id": payload.room_id,
            "admitted_on": payload.admitted_on,
        })),
    )
    .await?;
    tx.commit().await?;

    info!(monk_id = id, "monk admitted");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

/// PUT /monks/{id} — admin. A room move decrements the old room's counter
/// and increments the new one inside a single transaction.
pub async fn update(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Json(payload): Json<MonkPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let Some(existing) = state
        .store
        .fetch_one(
            &format!("SELECT {MONK_COLUMNS} FROM monks WHERE id = ?"),
            &[id.into()],
        )
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let full_name = payload.full_name.trim();
    if full_name.is_empty() {
        return Err(ViharaError::Invalid("full_name is required".to_string()));
    }
    let old_room = existing.integer("room_id");

    let mut tx = state.store.begin().await?;
    tx.update(
        "monks",
        &[
            ("full_name", full_name.into()),
            ("date_of_birth", payload.date_of_birth.clone().into()),
            ("room_id", payload.room_id.into()),
            ("admitted_on", payload.admitted_on.clone().into()),
            ("notes", payload.notes.clone().into()),
        ],
        "id = ?",
        &[id.into()],
    )
    .await?;
    if old_room != payload.room_id {
        if let Some(room_id) = old_room {
            adjust_occupancy(&mut tx, room_id, -1).await?;
        }
        if let Some(room_id) = payload.room_id {
            adjust_occupancy(&mut tx, room_id, 1).await?;
        }
    }
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Update,
        "monks",
        id,
        Some(serde_json::to_value(&existing)?),
        Some(json!({
            "full_name": full_name,
            "date_of_birth": payload.date_of_birth,
            "room_id": payload.room_id,
            "admitted_on": payload.admitted_on,
        })),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "updated": true })).into_response())
}

/// DELETE /monks/{id} — admin. One transaction removes the monk, their
/// appointments and medical records, their login actor, nulls out donation
/// references, and frees their room.
pub async fn remove(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let Some(existing) = state
        .store
        .fetch_one(
            &format!("SELECT {MONK_COLUMNS} FROM monks WHERE id = ?"),
            &[id.into()],
        )
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let mut tx = state.store.begin().await?;
    tx.delete("appointments", "monk_id = ?", &[id.into()]).await?;
    tx.delete("medical_records", "monk_id = ?", &[id.into()]).await?;
    if let Some(actor_id) = existing.integer("actor_id") {
        // Donations keep their row; only the reference to the departed
        // resident is cleared.
        tx.update(
            "donations",
            &[("donor_id", Value::Null)],
            "donor_id = ?",
            &[actor_id.into()],
        )
        .await?;
        tx.delete("actors", "id = ?", &[actor_id.into()]).await?;
    }
    if let Some(room_id) = existing.integer("room_id") {
        adjust_occupancy(&mut tx, room_id, -1).await?;
    }
    tx.delete("monks", "id = ?", &[id.into()]).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Delete,
        "monks",
        id,
        Some(serde_json::to_value(&existing)?),
        None,
    )
    .await?;
    tx.commit().await?;

    info!(monk_id = id, "monk removed");
    Ok(Json(json!({ "deleted": true })).into_response())
}

/// Keep `rooms.current_occupancy` in step with monk room assignments. Runs
/// inside the caller's transaction so the counter and the row it summarizes
/// commit or roll back together.
pub(crate) async fn adjust_occupancy(
    tx: &mut Tx,
    room_id: i64,
    delta: i64,
) -> Result<(), ViharaError> {
    let Some(room) = tx
        .fetch_one(
            "SELECT capacity, current_occupancy FROM rooms WHERE id = ?",
            &[room_id.into()],
        )
        .await?
    else {
        return Err(ViharaError::Invalid(format!("room {room_id} does not exist")));
    };
    let capacity = room.integer("capacity").unwrap_or(0);
    let occupancy = room.integer("current_occupancy").unwrap_or(0) + delta;
    if occupancy < 0 {
        return Err(ViharaError::Invalid(format!(
            "room {room_id} occupancy would go negative"
        )));
    }
    if delta > 0 && occupancy > capacity {
        return Err(ViharaError::Invalid(format!("room {room_id} is full")));
    }
    tx.update(
        "rooms",
        &[("current_occupancy", occupancy.into())],
        "id = ?",
        &[room_id.into()],
    )
    .await?;
    Ok(())
}
