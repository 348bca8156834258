use chrono::Utc;
use serde_json::Value as JsonValue;

use crate::error::ViharaError;
use crate::gate::Actor;
use crate::store::Tx;

#[derive(Debug, Clone, Copy)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

/// Append one audit row inside the caller's transaction, capturing who
/// performed the write and snapshots of the record before and after. The
/// snapshots are serialized blobs; the store inserts them like any other
/// column value.
pub async fn record(
    tx: &mut Tx,
    actor: &Actor,
    action: AuditAction,
    table: &str,
    record_id: i64,
    old_values: Option<JsonValue>,
    new_values: Option<JsonValue>,
) -> Result<(), ViharaError> {
    let old_blob = old_values.map(|v| serde_json::to_string(&v)).transpose()?;
    let new_blob = new_values.map(|v| serde_json::to_string(&v)).transpose()?;
    tx.insert(
        "audit_log",
        &[
            ("actor_role", actor.role.as_str().into()),
            ("actor_id", actor.id.into()),
            ("action", action.as_str().into()),
            ("table_name", table.into()),
            ("record_id", record_id.into()),
            ("old_values", old_blob.into()),
            ("new_values", new_blob.into()),
            ("created_at", Utc::now().into()),
        ],
    )
    .await?;
    Ok(())
}
