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
use crate::handlers::{doctor_profile_id, monk_profile_id, require_any, session_token};
use crate::router::ViharaState;
use crate::store::Row;

#[derive(Debug, Deserialize)]
pub struct AppointmentPayload {
    pub monk_id: i64,
    pub doctor_id: i64,
    pub scheduled_at: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: String,
}

const APPOINTMENT_COLUMNS: &str = "id, monk_id, doctor_id, scheduled_at, status, reason";

/// GET /appointments — admin sees all, a doctor their schedule, a monk
/// their own visits.
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
                    &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY scheduled_at"),
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
                        "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
                         WHERE doctor_id = ? ORDER BY scheduled_at"
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
                        "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
                         WHERE monk_id = ? ORDER BY scheduled_at"
                    ),
                    &[monk_id.into()],
                )
                .await?
        }
        Role::Donator => return Err(ViharaError::Forbidden),
    };
    Ok(Json(rows))
}

/// POST /appointments — admin. Monk and doctor are pre-validated so the
/// form can show a field-level message instead of a raw constraint error.
pub async fn create(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Json(payload): Json<AppointmentPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    if payload.scheduled_at.trim().is_empty() {
        return Err(ViharaError::Invalid("scheduled_at is required".to_string()));
    }
    let monk = state
        .store
        .fetch_one("SELECT id FROM monks WHERE id = ?", &[payload.monk_id.into()])
        .await?;
    if monk.is_none() {
        return Err(ViharaError::Invalid("selected monk does not exist".to_string()));
    }
    let doctor = state
        .store
        .fetch_one(
            "SELECT id FROM doctors WHERE id = ?",
            &[payload.doctor_id.into()],
        )
        .await?;
    if doctor.is_none() {
        return Err(ViharaError::Invalid("selected doctor does not exist".to_string()));
    }

    let mut tx = state.store.begin().await?;
    let id = tx
        .insert(
            "appointments",
            &[
                ("monk_id", payload.monk_id.into()),
                ("doctor_id", payload.doctor_id.into()),
                ("scheduled_at", payload.scheduled_at.as_str().into()),
                ("status", "scheduled".into()),
                ("reason", payload.reason.clone().into()),
            ],
        )
        .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Create,
        "appointments",
        id,
        None,
        Some(json!({
            "monk_id": payload.monk_id,
            "doctor_id": payload.doctor_id,
            "scheduled_at": payload.scheduled_at,
            "reason": payload.reason,
        })),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

/// PUT /appointments/{id}/status — the assigned doctor marks a visit
/// completed or cancelled.
pub async fn set_status(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Json(payload): Json<StatusPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Doctor)?;
    if !matches!(payload.status.as_str(), "completed" | "cancelled") {
        return Err(ViharaError::Invalid(
            "status must be completed or cancelled".to_string(),
        ));
    }
    let doctor_id = doctor_profile_id(&state.store, &actor).await?;
    let Some(existing) = state
        .store
        .fetch_one(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?"),
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
        "appointments",
        &[("status", payload.status.as_str().into())],
        "id = ?",
        &[id.into()],
    )
    .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Update,
        "appointments",
        id,
        Some(serde_json::to_value(&existing)?),
        Some(json!({ "status": payload.status })),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "updated": true })).into_response())
}
