use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::audit::{self, AuditAction};
use crate::error::ViharaError;
use crate::gate::Role;
use crate::handlers::{require_any, session_token};
use crate::router::ViharaState;
use crate::store::{Row, Value};

#[derive(Debug, Deserialize)]
pub struct DonationPayload {
    pub category_id: i64,
    pub amount_cents: i64,
    /// Walk-in donor name, only honored for admin-recorded donations.
    #[serde(default)]
    pub donor_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

const DONATION_COLUMNS: &str =
    "id, category_id, donor_id, donor_name, amount_cents, donated_at, note";

/// GET /donations — admin sees everything, a donator their own gifts.
pub async fn list(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
) -> Result<Json<Vec<Row>>, ViharaError> {
    let actor = require_any(
        &state.gate,
        session_token(&jar),
        &[Role::Admin, Role::Donator],
    )?;
    let rows = match actor.role {
        Role::Admin => {
            state
                .store
                .fetch_all(
                    &format!("SELECT {DONATION_COLUMNS} FROM donations ORDER BY donated_at DESC"),
                    &[],
                )
                .await?
        }
        _ => {
            state
                .store
                .fetch_all(
                    &format!(
                        "SELECT {DONATION_COLUMNS} FROM donations \
                         WHERE donor_id = ? ORDER BY donated_at DESC"
                    ),
                    &[actor.id.into()],
                )
                .await?
        }
    };
    Ok(Json(rows))
}

/// POST /donations — a donator gives under their own name; an admin records
/// a walk-in gift with no actor reference.
pub async fn create(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Json(payload): Json<DonationPayload>,
) -> Result<Response, ViharaError> {
    let actor = require_any(
        &state.gate,
        session_token(&jar),
        &[Role::Admin, Role::Donator],
    )?;
    if payload.amount_cents <= 0 {
        return Err(ViharaError::Invalid("amount must be positive".to_string()));
    }
    let category = state
        .store
        .fetch_one(
            "SELECT id FROM donation_categories WHERE id = ?",
            &[payload.category_id.into()],
        )
        .await?;
    if category.is_none() {
        return Err(ViharaError::Invalid(
            "selected category does not exist".to_string(),
        ));
    }

    let (donor_id, donor_name): (Value, Value) = match actor.role {
        Role::Admin => (
            Value::Null,
            payload
                .donor_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or("Anonymous")
                .into(),
        ),
        _ => (actor.id.into(), actor.display_name.as_str().into()),
    };

    let mut tx = state.store.begin().await?;
    let id = tx
        .insert(
            "donations",
            &[
                ("category_id", payload.category_id.into()),
                ("donor_id", donor_id),
                ("donor_name", donor_name),
                ("amount_cents", payload.amount_cents.into()),
                ("donated_at", Utc::now().into()),
                ("note", payload.note.clone().into()),
            ],
        )
        .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Create,
        "donations",
        id,
        None,
        Some(json!({
            "category_id": payload.category_id,
            "amount_cents": payload.amount_cents,
            "note": payload.note,
        })),
    )
    .await?;
    tx.commit().await?;

    info!(donation_id = id, amount_cents = payload.amount_cents, "donation recorded");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}
