//! Block repository, including the scheduler scan queries.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use dealdesk_core::models::{Block, BlockStatus, FinancialDecision, OverrideStatus};
use dealdesk_core::DealdeskResult;

use crate::rows::BlockRow;
use crate::{Conn, SqlxResultExt};

const COLUMNS: &str = "id, unit_id, requested_by, duration_days, status, override_status, \
     blocked_until, extension_count, financial_decision, reason, next_notify_at, created_at";

pub async fn insert(conn: &mut Conn, block: &Block) -> DealdeskResult<()> {
    sqlx::query(
        "INSERT INTO blocks (id, unit_id, requested_by, duration_days, status, override_status, \
         blocked_until, extension_count, financial_decision, reason, next_notify_at, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(block.id)
    .bind(block.unit_id)
    .bind(block.requested_by)
    .bind(block.duration_days)
    .bind(block.status.as_str())
    .bind(block.override_status.as_str())
    .bind(block.blocked_until)
    .bind(block.extension_count)
    .bind(block.financial_decision.map(|d| d.as_str()))
    .bind(&block.reason)
    .bind(block.next_notify_at)
    .bind(block.created_at)
    .execute(conn)
    .await
    .db()?;
    Ok(())
}

fn try_rows(rows: Vec<BlockRow>) -> DealdeskResult<Vec<Block>> {
    rows.into_iter().map(Block::try_from).collect()
}

pub async fn find_by_id(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<Block>> {
    let row = sqlx::query_as::<_, BlockRow>(&format!("SELECT {COLUMNS} FROM blocks WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .db()?;
    row.map(Block::try_from).transpose()
}

pub async fn find_by_id_for_update(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<Block>> {
    let row = sqlx::query_as::<_, BlockRow>(&format!(
        "SELECT {COLUMNS} FROM blocks WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .db()?;
    row.map(Block::try_from).transpose()
}

/// The approved, unexpired block holding a unit, if any.
pub async fn find_active_for_unit(
    conn: &mut Conn,
    unit_id: Uuid,
    now: DateTime<Utc>,
) -> DealdeskResult<Option<Block>> {
    let row = sqlx::query_as::<_, BlockRow>(&format!(
        "SELECT {COLUMNS} FROM blocks \
         WHERE unit_id = $1 AND status = 'approved' AND blocked_until > $2"
    ))
    .bind(unit_id)
    .bind(now)
    .fetch_optional(conn)
    .await
    .db()?;
    row.map(Block::try_from).transpose()
}

pub async fn update_status(conn: &mut Conn, id: Uuid, status: BlockStatus) -> DealdeskResult<()> {
    sqlx::query("UPDATE blocks SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

pub async fn update_override_status(
    conn: &mut Conn,
    id: Uuid,
    status: OverrideStatus,
) -> DealdeskResult<()> {
    sqlx::query("UPDATE blocks SET override_status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

pub async fn set_financial_decision(
    conn: &mut Conn,
    id: Uuid,
    decision: FinancialDecision,
) -> DealdeskResult<()> {
    sqlx::query("UPDATE blocks SET financial_decision = $2 WHERE id = $1")
        .bind(id)
        .bind(decision.as_str())
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

/// Apply an approved extension.
pub async fn extend(
    conn: &mut Conn,
    id: Uuid,
    blocked_until: DateTime<Utc>,
    extension_count: i32,
) -> DealdeskResult<()> {
    sqlx::query("UPDATE blocks SET blocked_until = $2, extension_count = $3 WHERE id = $1")
        .bind(id)
        .bind(blocked_until)
        .bind(extension_count)
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

pub async fn set_next_notify(
    conn: &mut Conn,
    id: Uuid,
    next_notify_at: DateTime<Utc>,
) -> DealdeskResult<()> {
    sqlx::query("UPDATE blocks SET next_notify_at = $2 WHERE id = $1")
        .bind(id)
        .bind(next_notify_at)
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

/// Approved blocks whose hold has lapsed. `FOR UPDATE SKIP LOCKED`
/// keeps concurrent scheduler instances from double-expiring a row.
pub async fn due_expiries(conn: &mut Conn, now: DateTime<Utc>) -> DealdeskResult<Vec<Block>> {
    let rows = sqlx::query_as::<_, BlockRow>(&format!(
        "SELECT {COLUMNS} FROM blocks \
         WHERE status = 'approved' AND blocked_until < $1 \
         FOR UPDATE SKIP LOCKED"
    ))
    .bind(now)
    .fetch_all(conn)
    .await
    .db()?;
    try_rows(rows)
}

/// Active holds whose reminder is due.
pub async fn due_reminders(conn: &mut Conn, now: DateTime<Utc>) -> DealdeskResult<Vec<Block>> {
    let rows = sqlx::query_as::<_, BlockRow>(&format!(
        "SELECT {COLUMNS} FROM blocks \
         WHERE status = 'approved' AND blocked_until > $1 \
           AND next_notify_at IS NOT NULL AND next_notify_at <= $1 \
         FOR UPDATE SKIP LOCKED"
    ))
    .bind(now)
    .fetch_all(conn)
    .await
    .db()?;
    try_rows(rows)
}
