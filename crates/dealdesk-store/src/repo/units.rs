//! Unit repository. Inventory CRUD itself is external; the engine only
//! reads units and moves them along the block -> reserve -> sell chain.

use uuid::Uuid;

use dealdesk_core::models::{Unit, UnitStatus};
use dealdesk_core::DealdeskResult;

use crate::rows::UnitRow;
use crate::{Conn, SqlxResultExt};

const COLUMNS: &str = "id, code, unit_status, available, model_id, base_price, garden_price, \
     roof_price, storage_price, garage_price, maintenance_price, annual_rate_percent, standard_pv";

pub async fn find_by_id(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<Unit>> {
    let row = sqlx::query_as::<_, UnitRow>(&format!("SELECT {COLUMNS} FROM units WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .db()?;
    Ok(row.map(Unit::from))
}

/// Row-locked read used inside state transitions.
pub async fn find_by_id_for_update(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<Unit>> {
    let row = sqlx::query_as::<_, UnitRow>(&format!(
        "SELECT {COLUMNS} FROM units WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .db()?;
    Ok(row.map(Unit::from))
}

/// Full row including the FM standard-plan configuration.
pub async fn find_row_by_id(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<UnitRow>> {
    sqlx::query_as::<_, UnitRow>(&format!("SELECT {COLUMNS} FROM units WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .db()
}

/// Move a unit to `status`, keeping the availability flag consistent
/// with it.
pub async fn set_state(conn: &mut Conn, id: Uuid, status: UnitStatus) -> DealdeskResult<()> {
    sqlx::query("UPDATE units SET unit_status = $2, available = $3 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .bind(status.implies_available())
        .execute(conn)
        .await
        .db()?;
    Ok(())
}
