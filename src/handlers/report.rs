use axum::Json;
use axum::extract::State;
use serde_json::{Value as JsonValue, json};

use crate::error::ViharaError;
use crate::router::ViharaState;

/// GET /report/public — the unauthenticated transparency report: what came
/// in per category, what went out, and the balance. Data only; how it is
/// presented is the front end's business.
pub async fn public_report(
    State(state): State<ViharaState>,
) -> Result<Json<JsonValue>, ViharaError> {
    let categories = state
        .store
        .fetch_all(
            "SELECT c.id, c.name, COALESCE(SUM(d.amount_cents), 0) AS total_cents \
             FROM donation_categories c \
             LEFT JOIN donations d ON d.category_id = c.id \
             GROUP BY c.id, c.name \
             ORDER BY c.name",
            &[],
        )
        .await?;
    let donated = state
        .store
        .fetch_one(
            "SELECT COALESCE(SUM(amount_cents), 0) AS n FROM donations",
            &[],
        )
        .await?
        .and_then(|r| r.integer("n"))
        .unwrap_or(0);
    let spent = state
        .store
        .fetch_one(
            "SELECT COALESCE(SUM(amount_cents), 0) AS n FROM expenses",
            &[],
        )
        .await?
        .and_then(|r| r.integer("n"))
        .unwrap_or(0);

    Ok(Json(json!({
        "categories": categories,
        "total_donated_cents": donated,
        "total_spent_cents": spent,
        "balance_cents": donated - spent,
    })))
}
