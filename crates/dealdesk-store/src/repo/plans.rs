//! Payment plan repository.

use uuid::Uuid;

use dealdesk_core::models::{PaymentPlan, PlanStatus};
use dealdesk_core::DealdeskResult;

use crate::rows::PaymentPlanRow;
use crate::{Conn, SqlxResultExt};

const COLUMNS: &str = "id, deal_id, details, created_by, status, accepted, version, created_at";

pub async fn insert(conn: &mut Conn, plan: &PaymentPlan) -> DealdeskResult<()> {
    sqlx::query(
        "INSERT INTO payment_plans (id, deal_id, details, created_by, status, accepted, version, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(plan.id)
    .bind(plan.deal_id)
    .bind(&plan.details)
    .bind(plan.created_by)
    .bind(plan.status.as_str())
    .bind(plan.accepted)
    .bind(plan.version)
    .bind(plan.created_at)
    .execute(conn)
    .await
    .db()?;
    Ok(())
}

pub async fn find_by_id(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<PaymentPlan>> {
    let row = sqlx::query_as::<_, PaymentPlanRow>(&format!(
        "SELECT {COLUMNS} FROM payment_plans WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .db()?;
    Ok(row.map(PaymentPlan::from))
}

pub async fn find_by_id_for_update(
    conn: &mut Conn,
    id: Uuid,
) -> DealdeskResult<Option<PaymentPlan>> {
    let row = sqlx::query_as::<_, PaymentPlanRow>(&format!(
        "SELECT {COLUMNS} FROM payment_plans WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .db()?;
    Ok(row.map(PaymentPlan::from))
}

/// Approval queue for one pending status, oldest first.
pub async fn queue(conn: &mut Conn, status: PlanStatus) -> DealdeskResult<Vec<PaymentPlan>> {
    let rows = sqlx::query_as::<_, PaymentPlanRow>(&format!(
        "SELECT {COLUMNS} FROM payment_plans WHERE status = $1 ORDER BY created_at"
    ))
    .bind(status.as_str())
    .fetch_all(conn)
    .await
    .db()?;
    Ok(rows.into_iter().map(PaymentPlan::from).collect())
}

pub async fn update_status(conn: &mut Conn, id: Uuid, status: PlanStatus) -> DealdeskResult<()> {
    sqlx::query("UPDATE payment_plans SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

/// Clear the accepted flag on every plan of a deal. Runs in the same
/// transaction as `mark_accepted` so the one-accepted-plan invariant
/// holds at commit.
pub async fn clear_accepted(conn: &mut Conn, deal_id: Uuid) -> DealdeskResult<()> {
    sqlx::query("UPDATE payment_plans SET accepted = FALSE WHERE deal_id = $1 AND accepted")
        .bind(deal_id)
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

pub async fn mark_accepted(conn: &mut Conn, id: Uuid) -> DealdeskResult<()> {
    sqlx::query("UPDATE payment_plans SET accepted = TRUE WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

/// Next version number for a deal's plans, starting at 1.
pub async fn next_version(conn: &mut Conn, deal_id: Uuid) -> DealdeskResult<i32> {
    let version: Option<i32> =
        sqlx::query_scalar("SELECT MAX(version) FROM payment_plans WHERE deal_id = $1")
            .bind(deal_id)
            .fetch_one(conn)
            .await
            .db()?;
    Ok(version.unwrap_or(0) + 1)
}
