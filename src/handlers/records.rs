use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::audit::{self, AuditAction};
use crate::error::ViharaError;
use crate::gate::Role;
use crate::handlers::{doctor_profile_id, monk_profile_id, require_any, session_token};
use crate::router::ViharaState;
use crate::store::Row;

#[derive(Debug, Deserialize)]
pub struct RecordPayload {
    pub monk_id: i64,
    pub diagnosis: String,
    #[serde(default)]
    pub treatment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordUpdatePayload {
    pub diagnosis: String,
    #[serde(default)]
    pub treatment: Option<String>,
    pub status: String,
}

const RECORD_COLUMNS: &str = "id, monk_id, doctor_id, recorded_at, diagnosis, treatment, status";

/// GET /records — admin sees all, a doctor their own entries, a monk their
/// own history.
pub async fn list(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
) -> Result<Json<Vec<Row>>, ViharaError> {
    let actor = require_any(
        &state.gate,
        session_token(&jar),
        &[Role::Admin, Role::Doctor, Role::Monk],
    )?;

    let rows = match actor.role {
        Role::Admin => {
            state
                .store
                .fetch_all(
                    &format!("SELECT {RECORD_COLUMNS} FROM medical_records ORDER BY recorded_at DESC"),
                    &[],
                )
                .await?
        }
        Role::Doctor => {
            let doctor_id = doctor_profile_id(&state.store, &actor).await?;
            state
                .store
                .fetch_all(
                    &format!(
                        "SELECT {RECORD_COLUMNS} FROM medical_records \
                         WHERE doctor_id = ? ORDER BY recorded_at DESC"
                    ),
                    &[doctor_id.into()],
                )
                .await?
        }
        Role::Monk => {
            let monk_id = monk_profile_id(&state.store, &actor).await?;
            state
                .store
                .fetch_all(
                    &format!(
                        "SELECT {RECORD_COLUMNS} FROM medical_records \
                         WHERE monk_id = ? ORDER BY recorded_at DESC"
                    ),
                    &[monk_id.into()],
                )
                .await?
        }
        Role::Donator => return Err(ViharaError::Forbidden),
    };
    Ok(Json(rows))
}

/// POST /records — doctor. The entry is stamped with the author's doctor
/// profile and opens in `open` status.
pub async fn create(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Json(payload): Json<RecordPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Doctor)?;
    let diagnosis = payload.diagnosis.trim();
    if diagnosis.is_empty() {
        return Err(ViharaError::Invalid("diagnosis is required".to_string()));
    }
    let doctor_id = doctor_profile_id(&state.store, &actor).await?;
    let monk = state
        .store
        .fetch_one("SELECT id FROM monks WHERE id = ?", &[payload.monk_id.into()])
        .await?;
    if monk.is_none() {
        return Err(ViharaError::Invalid("selected monk does not exist".to_string()));
    }

    let mut tx = state.store.begin().await?;
    let id = tx
        .insert(
            "medical_records",
            &[
                ("monk_id", payload.monk_id.into()),
                ("doctor_id", doctor_id.into()),
                ("recorded_at", Utc::now().into()),
                ("diagnosis", diagnosis.into()),
                ("treatment", payload.treatment.clone().into()),
                ("status", "open".into()),
            ],
        )
        .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Create,
        "medical_records",
        id,
        None,
        Some(json!({
            "monk_id": payload.monk_id,
            "diagnosis": diagnosis,
            "treatment": payload.treatment,
        })),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

/// PUT /records/{id} — the authoring doctor amends or closes the entry.
pub async fn update(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Json(payload): Json<RecordUpdatePayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Doctor)?;
    let diagnosis = payload.diagnosis.trim();
    if diagnosis.is_empty() {
        return Err(ViharaError::Invalid("diagnosis is required".to_string()));
    }
    if !matches!(payload.status.as_str(), "open" | "closed") {
        return Err(ViharaError::Invalid("status must be open or closed".to_string()));
    }
    let doctor_id = doctor_profile_id(&state.store, &actor).await?;
    let Some(existing) = state
        .store
        .fetch_one(
            &format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE id = ?"),
            &[id.into()],
        )
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    if existing.integer("doctor_id") != Some(doctor_id) {
        return Err(ViharaError::Forbidden);
    }

    let mut tx = state.store.begin().await?;
    tx.update(
        "medical_records",
        &[
            ("diagnosis", diagnosis.into()),
            ("treatment", payload.treatment.clone().into()),
            ("status", payload.status.as_str().into()),
        ],
        "id = ?",
        &[id.into()],
    )
    .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Update,
        "medical_records",
        id,
        Some(serde_json::to_value(&existing)?),
        Some(json!({
            "diagnosis": diagnosis,
            "treatment": payload.treatment,
            "status": payload.status,
        })),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "updated": true })).into_response())
}
