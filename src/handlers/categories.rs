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
use crate::handlers::{require_any, session_token};
use crate::router::ViharaState;
use crate::store::Row;

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// GET /categories — admin and donators. Totals are aggregated at read
/// time, never stored.
pub async fn list(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
) -> Result<Json<Vec<Row>>, ViharaError> {
    require_any(
        &state.gate,
        session_token(&jar),
        &[Role::Admin, Role::Donator],
    )?;
    let rows = state
        .store
        .fetch_all(
            "SELECT c.id, c.name, c.description, \
             COALESCE(SUM(d.amount_cents), 0) AS total_cents \
             FROM donation_categories c \
             LEFT JOIN donations d ON d.category_id = c.id \
             GROUP BY c.id, c.name, c.description \
             ORDER BY c.name",
            &[],
        )
        .await?;
    Ok(Json(rows))
}

/// POST /categories — admin. The name is pre-checked so a duplicate gets a
/// field-level message; the UNIQUE constraint still backstops a race.
pub async fn create(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Json(payload): Json<CategoryPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ViharaError::Invalid("name is required".to_string()));
    }
    let duplicate = state
        .store
        .fetch_one(
            "SELECT id FROM donation_categories WHERE name = ?",
            &[name.into()],
        )
        .await?;
    if duplicate.is_some() {
        return Err(ViharaError::Invalid(format!(
            "category {name:?} already exists"
        )));
    }

    let mut tx = state.store.begin().await?;
    let id = tx
        .insert(
            "donation_categories",
            &[
                ("name", name.into()),
                ("description", payload.description.clone().into()),
            ],
        )
        .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Create,
        "donation_categories",
        id,
        None,
        Some(json!({ "name": name, "description": payload.description })),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

/// PUT /categories/{id} — admin.
pub async fn update(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let Some(existing) = state
        .store
        .fetch_one(
            "SELECT id, name, description FROM donation_categories WHERE id = ?",
            &[id.into()],
        )
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ViharaError::Invalid("name is required".to_string()));
    }

    let mut tx = state.store.begin().await?;
    tx.update(
        "donation_categories",
        &[
            ("name", name.into()),
            ("description", payload.description.clone().into()),
        ],
        "id = ?",
        &[id.into()],
    )
    .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Update,
        "donation_categories",
        id,
        Some(serde_json::to_value(&existing)?),
        Some(json!({ "name": name, "description": payload.description })),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "updated": true })).into_response())
}

/// DELETE /categories/{id} — admin. Refused while donations reference it;
/// the transparency report must keep adding up.
pub async fn remove(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let Some(existing) = state
        .store
        .fetch_one(
            "SELECT id, name, description FROM donation_categories WHERE id = ?",
            &[id.into()],
        )
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let referenced = state
        .store
        .fetch_one(
            "SELECT COUNT(*) AS n FROM donations WHERE category_id = ?",
            &[id.into()],
        )
        .await?;
    if referenced.and_then(|r| r.integer("n")).unwrap_or(0) > 0 {
        return Err(ViharaError::Invalid(
            "category has donations recorded against it".to_string(),
        ));
    }

    let mut tx = state.store.begin().await?;
    tx.delete("donation_categories", "id = ?", &[id.into()]).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Delete,
        "donation_categories",
        id,
        Some(serde_json::to_value(&existing)?),
        None,
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "deleted": true })).into_response())
}
