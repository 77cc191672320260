//! Append-only history, one table per tracked entity.

use uuid::Uuid;

use dealdesk_core::models::{ChangeType, EntityKind, HistoryEntry};
use dealdesk_core::{DealdeskError, DealdeskResult};

use crate::{Conn, SqlxResultExt};

fn table_for(kind: EntityKind) -> DealdeskResult<&'static str> {
    match kind {
        EntityKind::Deal => Ok("deal_history"),
        EntityKind::PaymentPlan => Ok("payment_plan_history"),
        EntityKind::Block => Ok("block_history"),
        EntityKind::ReservationForm => Ok("reservation_form_history"),
        EntityKind::Contract => Ok("contract_history"),
        EntityKind::Unit => Err(DealdeskError::internal(
            "Units have no history table; changes are recorded on the owning block",
        )),
    }
}

pub async fn append(
    conn: &mut Conn,
    kind: EntityKind,
    entry: &HistoryEntry,
) -> DealdeskResult<()> {
    let table = table_for(kind)?;
    sqlx::query(&format!(
        "INSERT INTO {table} (entity_id, change_type, changed_by, old_values, new_values, at) \
         VALUES ($1, $2, $3, $4, $5, $6)"
    ))
    .bind(entry.entity_id)
    .bind(entry.change_type.as_str())
    .bind(entry.changed_by)
    .bind(&entry.old_values)
    .bind(&entry.new_values)
    .bind(entry.at)
    .execute(conn)
    .await
    .db()?;
    Ok(())
}

/// Ordered change types for one entity, oldest first.
pub async fn change_sequence(
    conn: &mut Conn,
    kind: EntityKind,
    entity_id: Uuid,
) -> DealdeskResult<Vec<ChangeType>> {
    let table = table_for(kind)?;
    let types: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT change_type FROM {table} WHERE entity_id = $1 ORDER BY at, id"
    ))
    .bind(entity_id)
    .fetch_all(conn)
    .await
    .db()?;
    types.into_iter().map(ChangeType::try_from).collect()
}
