//! Contract repository.

use sqlx::types::Json;
use uuid::Uuid;

use dealdesk_core::models::{Contract, ContractSettings, ContractStatus};
use dealdesk_core::DealdeskResult;

use crate::rows::ContractRow;
use crate::{Conn, SqlxResultExt};

const COLUMNS: &str = "id, reservation_form_id, status, contract_settings_locked, settings, \
     details, created_by, created_at";

pub async fn insert(conn: &mut Conn, contract: &Contract) -> DealdeskResult<()> {
    sqlx::query(
        "INSERT INTO contracts (id, reservation_form_id, status, contract_settings_locked, \
         settings, details, created_by, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(contract.id)
    .bind(contract.reservation_form_id)
    .bind(contract.status.as_str())
    .bind(contract.contract_settings_locked)
    .bind(Json(&contract.settings))
    .bind(&contract.details)
    .bind(contract.created_by)
    .bind(contract.created_at)
    .execute(conn)
    .await
    .db()?;
    Ok(())
}

pub async fn find_by_id(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<Contract>> {
    let row = sqlx::query_as::<_, ContractRow>(&format!(
        "SELECT {COLUMNS} FROM contracts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .db()?;
    Ok(row.map(Contract::from))
}

pub async fn find_by_id_for_update(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<Contract>> {
    let row = sqlx::query_as::<_, ContractRow>(&format!(
        "SELECT {COLUMNS} FROM contracts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .db()?;
    Ok(row.map(Contract::from))
}

pub async fn update_status(
    conn: &mut Conn,
    id: Uuid,
    status: ContractStatus,
) -> DealdeskResult<()> {
    sqlx::query("UPDATE contracts SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

pub async fn update_settings(
    conn: &mut Conn,
    id: Uuid,
    settings: &ContractSettings,
) -> DealdeskResult<()> {
    sqlx::query("UPDATE contracts SET settings = $2 WHERE id = $1")
        .bind(id)
        .bind(Json(settings))
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

/// One-way settings lock.
pub async fn lock_settings(conn: &mut Conn, id: Uuid) -> DealdeskResult<()> {
    sqlx::query("UPDATE contracts SET contract_settings_locked = TRUE WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .db()?;
    Ok(())
}
