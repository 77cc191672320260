//! Reservation form repository.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

use dealdesk_core::models::{ReservationDetails, ReservationForm, ReservationStatus};
use dealdesk_core::DealdeskResult;

use crate::rows::ReservationFormRow;
use crate::{Conn, SqlxResultExt};

const COLUMNS: &str = "id, payment_plan_id, unit_id, reservation_date, preliminary_payment, \
     status, details, created_by, created_at";

pub async fn insert(conn: &mut Conn, form: &ReservationForm) -> DealdeskResult<()> {
    sqlx::query(
        "INSERT INTO reservation_forms (id, payment_plan_id, unit_id, reservation_date, \
         preliminary_payment, status, details, created_by, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(form.id)
    .bind(form.payment_plan_id)
    .bind(form.unit_id)
    .bind(form.reservation_date)
    .bind(form.preliminary_payment)
    .bind(form.status.as_str())
    .bind(Json(&form.details))
    .bind(form.created_by)
    .bind(form.created_at)
    .execute(conn)
    .await
    .db()?;
    Ok(())
}

pub async fn find_by_id(conn: &mut Conn, id: Uuid) -> DealdeskResult<Option<ReservationForm>> {
    let row = sqlx::query_as::<_, ReservationFormRow>(&format!(
        "SELECT {COLUMNS} FROM reservation_forms WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .db()?;
    Ok(row.map(ReservationForm::from))
}

pub async fn find_by_id_for_update(
    conn: &mut Conn,
    id: Uuid,
) -> DealdeskResult<Option<ReservationForm>> {
    let row = sqlx::query_as::<_, ReservationFormRow>(&format!(
        "SELECT {COLUMNS} FROM reservation_forms WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .db()?;
    Ok(row.map(ReservationForm::from))
}

/// Whether the plan already carries a pending or approved form.
pub async fn occupying_form_exists(conn: &mut Conn, plan_id: Uuid) -> DealdeskResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM reservation_forms \
         WHERE payment_plan_id = $1 AND status IN ('pending_approval', 'approved'))",
    )
    .bind(plan_id)
    .fetch_one(conn)
    .await
    .db()?;
    Ok(exists)
}

/// The approved form for a plan, used by the document gate.
pub async fn approved_for_plan(
    conn: &mut Conn,
    plan_id: Uuid,
) -> DealdeskResult<Option<ReservationForm>> {
    let row = sqlx::query_as::<_, ReservationFormRow>(&format!(
        "SELECT {COLUMNS} FROM reservation_forms \
         WHERE payment_plan_id = $1 AND status = 'approved'"
    ))
    .bind(plan_id)
    .fetch_optional(conn)
    .await
    .db()?;
    Ok(row.map(ReservationForm::from))
}

pub async fn update_status(
    conn: &mut Conn,
    id: Uuid,
    status: ReservationStatus,
) -> DealdeskResult<()> {
    sqlx::query("UPDATE reservation_forms SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

pub async fn update_details(
    conn: &mut Conn,
    id: Uuid,
    details: &ReservationDetails,
) -> DealdeskResult<()> {
    sqlx::query("UPDATE reservation_forms SET details = $2 WHERE id = $1")
        .bind(id)
        .bind(Json(details))
        .execute(conn)
        .await
        .db()?;
    Ok(())
}

/// Apply an approved amendment: the record mutates and the archive
/// travels in `details` within the same statement.
pub async fn apply_amendment(
    conn: &mut Conn,
    id: Uuid,
    reservation_date: NaiveDate,
    preliminary_payment: Decimal,
    details: &ReservationDetails,
) -> DealdeskResult<()> {
    sqlx::query(
        "UPDATE reservation_forms \
         SET reservation_date = $2, preliminary_payment = $3, details = $4 WHERE id = $1",
    )
    .bind(id)
    .bind(reservation_date)
    .bind(preliminary_payment)
    .bind(Json(details))
    .execute(conn)
    .await
    .db()?;
    Ok(())
}
