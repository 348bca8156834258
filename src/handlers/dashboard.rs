use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::PrivateCookieJar;
use serde_json::{Value as JsonValue, json};

use crate::error::ViharaError;
use crate::gate::Role;
use crate::handlers::{doctor_profile_id, monk_profile_id, require_any, session_token};
use crate::router::ViharaState;
use crate::store::{DataStore, Value};

/// GET /dashboard — a role-dependent summary. Every figure is computed at
/// read time from the rows themselves; the only stored counter in the
/// system is room occupancy.
pub async fn summary(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
) -> Result<Json<JsonValue>, ViharaError> {
    let actor = require_any(
        &state.gate,
        session_token(&jar),
        &[Role::Admin, Role::Doctor, Role::Monk, Role::Donator],
    )?;
    let store = &state.store;

    let body = match actor.role {
        Role::Admin => json!({
            "role": "admin",
            "monks": scalar(store, "SELECT COUNT(*) AS n FROM monks", &[]).await?,
            "doctors": scalar(store, "SELECT COUNT(*) AS n FROM doctors", &[]).await?,
            "occupancy": scalar(
                store,
                "SELECT COALESCE(SUM(current_occupancy), 0) AS n FROM rooms",
                &[],
            )
            .await?,
            "capacity": scalar(
                store,
                "SELECT COALESCE(SUM(capacity), 0) AS n FROM rooms",
                &[],
            )
            .await?,
            "scheduled_appointments": scalar(
                store,
                "SELECT COUNT(*) AS n FROM appointments WHERE status = 'scheduled'",
                &[],
            )
            .await?,
            "total_donated_cents": scalar(
                store,
                "SELECT COALESCE(SUM(amount_cents), 0) AS n FROM donations",
                &[],
            )
            .await?,
            "total_spent_cents": scalar(
                store,
                "SELECT COALESCE(SUM(amount_cents), 0) AS n FROM expenses",
                &[],
            )
            .await?,
        }),
        Role::Doctor => {
            let doctor_id = doctor_profile_id(store, &actor).await?;
            json!({
                "role": "doctor",
                "appointments_today": scalar(
                    store,
                    "SELECT COUNT(*) AS n FROM appointments \
                     WHERE doctor_id = ? AND status = 'scheduled' \
                     AND date(scheduled_at) = date('now')",
                    &[doctor_id.into()],
                )
                .await?,
                "open_records": scalar(
                    store,
                    "SELECT COUNT(*) AS n FROM medical_records \
                     WHERE doctor_id = ? AND status = 'open'",
                    &[doctor_id.into()],
                )
                .await?,
            })
        }
        Role::Monk => {
            let monk_id = monk_profile_id(store, &actor).await?;
            json!({
                "role": "monk",
                "upcoming_appointments": scalar(
                    store,
                    "SELECT COUNT(*) AS n FROM appointments \
                     WHERE monk_id = ? AND status = 'scheduled' \
                     AND scheduled_at >= datetime('now')",
                    &[monk_id.into()],
                )
                .await?,
                "open_records": scalar(
                    store,
                    "SELECT COUNT(*) AS n FROM medical_records \
                     WHERE monk_id = ? AND status = 'open'",
                    &[monk_id.into()],
                )
                .await?,
            })
        }
        Role::Donator => json!({
            "role": "donator",
            "donation_count": scalar(
                store,
                "SELECT COUNT(*) AS n FROM donations WHERE donor_id = ?",
                &[actor.id.into()],
            )
            .await?,
            "total_donated_cents": scalar(
                store,
                "SELECT COALESCE(SUM(amount_cents), 0) AS n FROM donations WHERE donor_id = ?",
                &[actor.id.into()],
            )
            .await?,
        }),
    };
    Ok(Json(body))
}

async fn scalar(store: &DataStore, sql: &str, params: &[Value]) -> Result<i64, ViharaError> {
    Ok(store
        .fetch_one(sql, params)
        .await?
        .and_then(|r| r.integer("n"))
        .unwrap_or(0))
}
