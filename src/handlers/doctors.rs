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
pub struct DoctorPayload {
    pub full_name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

const DOCTOR_COLUMNS: &str = "id, actor_id, full_name, specialty, phone";

/// GET /doctors — admin.
pub async fn list(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
) -> Result<Json<Vec<Row>>, ViharaError> {
    state.gate.require_role(session_token(&jar), Role::Admin)?;
    let rows = state
        .store
        .fetch_all(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY full_name"),
            &[],
        )
        .await?;
    Ok(Json(rows))
}

/// GET /doctors/{id} — admin.
pub async fn get(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, ViharaError> {
    state.gate.require_role(session_token(&jar), Role::Admin)?;
    let row = state
        .store
        .fetch_one(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?"),
            &[id.into()],
        )
        .await?;
    match row {
        Some(row) => Ok(Json(row).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// POST /doctors — admin.
pub async fn create(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Json(payload): Json<DoctorPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let full_name = payload.full_name.trim();
    if full_name.is_empty() {
        return Err(ViharaError::Invalid("full_name is required".to_string()));
    }

    let mut tx = state.store.begin().await?;
    let id = tx
        .insert(
            "doctors",
            &[
                ("full_name", full_name.into()),
                ("specialty", payload.specialty.clone().into()),
                ("phone", payload.phone.clone().into()),
            ],
        )
        .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Create,
        "doctors",
        id,
        None,
        Some(json!({
            "full_name": full_name,
            "specialty": payload.specialty,
            "phone": payload.phone,
        })),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

/// PUT /doctors/{id} — admin.
pub async fn update(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Json(payload): Json<DoctorPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let Some(existing) = state
        .store
        .fetch_one(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?"),
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

    let mut tx = state.store.begin().await?;
    tx.update(
        "doctors",
        &[
            ("full_name", full_name.into()),
            ("specialty", payload.specialty.clone().into()),
            ("phone", payload.phone.clone().into()),
        ],
        "id = ?",
        &[id.into()],
    )
    .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Update,
        "doctors",
        id,
        Some(serde_json::to_value(&existing)?),
        Some(json!({
            "full_name": full_name,
            "specialty": payload.specialty,
            "phone": payload.phone,
        })),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "updated": true })).into_response())
}

/// DELETE /doctors/{id} — admin. Refused while the doctor still has
/// scheduled appointments; closed history keeps its doctor reference.
pub async fn remove(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let Some(existing) = state
        .store
        .fetch_one(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?"),
            &[id.into()],
        )
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let pending = state
        .store
        .fetch_one(
            "SELECT COUNT(*) AS n FROM appointments WHERE doctor_id = ? AND status = 'scheduled'",
            &[id.into()],
        )
        .await?;
    if pending.and_then(|r| r.integer("n")).unwrap_or(0) > 0 {
        return Err(ViharaError::Invalid(
            "doctor still has scheduled appointments; reassign or cancel them first".to_string(),
        ));
    }

    let mut tx = state.store.begin().await?;
    if let Some(actor_id) = existing.integer("actor_id") {
        tx.delete("actors", "id = ?", &[actor_id.into()]).await?;
    }
    tx.delete("doctors", "id = ?", &[id.into()]).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Delete,
        "doctors",
        id,
        Some(serde_json::to_value(&existing)?),
        None,
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "deleted": true })).into_response())
}
