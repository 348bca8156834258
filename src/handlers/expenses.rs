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
pub struct ExpensePayload {
    pub description: String,
    pub amount_cents: i64,
    pub spent_on: String,
    #[serde(default)]
    pub category_id: Option<i64>,
}

const EXPENSE_COLUMNS: &str = "id, category_id, description, amount_cents, spent_on";

/// GET /expenses — admin.
pub async fn list(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
) -> Result<Json<Vec<Row>>, ViharaError> {
    state.gate.require_role(session_token(&jar), Role::Admin)?;
    let rows = state
        .store
        .fetch_all(
            &format!("SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY spent_on DESC"),
            &[],
        )
        .await?;
    Ok(Json(rows))
}

/// POST /expenses — admin.
pub async fn create(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Json(payload): Json<ExpensePayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    validate(&state, &payload).await?;
    let description = payload.description.trim();

    let mut tx = state.store.begin().await?;
    let id = tx
        .insert(
            "expenses",
            &[
                ("category_id", payload.category_id.into()),
                ("description", description.into()),
                ("amount_cents", payload.amount_cents.into()),
                ("spent_on", payload.spent_on.as_str().into()),
            ],
        )
        .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Create,
        "expenses",
        id,
        None,
        Some(json!({
            "category_id": payload.category_id,
            "description": description,
            "amount_cents": payload.amount_cents,
            "spent_on": payload.spent_on,
        })),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

/// PUT /expenses/{id} — admin.
pub async fn update(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Json(payload): Json<ExpensePayload>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let Some(existing) = state
        .store
        .fetch_one(
            &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?"),
            &[id.into()],
        )
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    validate(&state, &payload).await?;
    let description = payload.description.trim();

    let mut tx = state.store.begin().await?;
    tx.update(
        "expenses",
        &[
            ("category_id", payload.category_id.into()),
            ("description", description.into()),
            ("amount_cents", payload.amount_cents.into()),
            ("spent_on", payload.spent_on.as_str().into()),
        ],
        "id = ?",
        &[id.into()],
    )
    .await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Update,
        "expenses",
        id,
        Some(serde_json::to_value(&existing)?),
        Some(json!({
            "category_id": payload.category_id,
            "description": description,
            "amount_cents": payload.amount_cents,
            "spent_on": payload.spent_on,
        })),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "updated": true })).into_response())
}

/// DELETE /expenses/{id} — admin.
pub async fn remove(
    State(state): State<ViharaState>,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, ViharaError> {
    let actor = state.gate.require_role(session_token(&jar), Role::Admin)?;
    let Some(existing) = state
        .store
        .fetch_one(
            &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?"),
            &[id.into()],
        )
        .await?
    else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let mut tx = state.store.begin().await?;
    tx.delete("expenses", "id = ?", &[id.into()]).await?;
    audit::record(
        &mut tx,
        &actor,
        AuditAction::Delete,
        "expenses",
        id,
        Some(serde_json::to_value(&existing)?),
        None,
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "deleted": true })).into_response())
}

async fn validate(state: &ViharaState, payload: &ExpensePayload) -> Result<(), ViharaError> {
    if payload.description.trim().is_empty() {
        return Err(ViharaError::Invalid("description is required".to_string()));
    }
    if payload.amount_cents <= 0 {
        return Err(ViharaError::Invalid("amount must be positive".to_string()));
    }
    if payload.spent_on.trim().is_empty() {
        return Err(ViharaError::Invalid("spent_on is required".to_string()));
    }
    if let Some(category_id) = payload.category_id {
        let category = state
            .store
            .fetch_one(
                "SELECT id FROM donation_categories WHERE id = ?",
                &[category_id.into()],
            )
            .await?;
        if category.is_none() {
            return Err(ViharaError::Invalid(
                "selected category does not exist".to_string(),
            ));
        }
    }
    Ok(())
}
