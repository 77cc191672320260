//! Reservation form endpoints.

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use chrono::NaiveDate;
use dealdesk_core::DealdeskError;
use dealdesk_engine::{AmendmentInput, CreateReservationRequest};
use dealdesk_evaluator::dated::{parse_document_date_tagged, DateForm};

use crate::auth::AuthPrincipal;
use crate::envelope::{ok, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationBody {
    pub payment_plan_id: Uuid,
    /// `dd/MM/YYYY`; ISO dates are accepted but logged
    pub reservation_date: String,
    pub preliminary_payment: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendmentBody {
    pub new_reservation_date: String,
    pub new_preliminary_payment: Decimal,
    pub reason: String,
}

/// Strict-first date parsing; lenient ISO input is allowed but logged
/// so the ambiguity stays visible.
fn parse_date(field: &str, value: &str) -> Result<NaiveDate, DealdeskError> {
    match parse_document_date_tagged(value) {
        Some((date, DateForm::Strict)) => Ok(date),
        Some((date, DateForm::IsoFallback)) => {
            warn!(field, value, "accepted ISO date; expected dd/MM/YYYY");
            Ok(date)
        }
        None => Err(DealdeskError::invalid_field(
            field,
            "Expected a dd/MM/YYYY date",
        )),
    }
}

pub async fn create(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(body): Json<CreateReservationBody>,
) -> ApiResult<Json<Value>> {
    let reservation_date = parse_date("reservationDate", &body.reservation_date)?;
    let form = state
        .engine
        .reservations
        .create(
            principal,
            CreateReservationRequest {
                payment_plan_id: body.payment_plan_id,
                reservation_date,
                preliminary_payment: body.preliminary_payment,
            },
        )
        .await?;
    Ok(ok(json!({ "reservationForm": form })))
}

pub async fn approve(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let form = state.engine.reservations.approve(principal, id).await?;
    Ok(ok(json!({ "reservationForm": form })))
}

pub async fn reject(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let form = state.engine.reservations.reject(principal, id).await?;
    Ok(ok(json!({ "reservationForm": form })))
}

pub async fn cancel(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let form = state.engine.reservations.cancel(principal, id).await?;
    Ok(ok(json!({ "reservationForm": form })))
}

pub async fn request_amendment(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(body): Json<AmendmentBody>,
) -> ApiResult<Json<Value>> {
    let new_reservation_date = parse_date("newReservationDate", &body.new_reservation_date)?;
    let form = state
        .engine
        .reservations
        .request_amendment(
            principal,
            id,
            AmendmentInput {
                new_reservation_date,
                new_preliminary_payment: body.new_preliminary_payment,
                reason: body.reason,
            },
        )
        .await?;
    Ok(ok(json!({ "reservationForm": form })))
}

pub async fn approve_amendment(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let form = state
        .engine
        .reservations
        .approve_amendment(principal, id)
        .await?;
    Ok(ok(json!({ "reservationForm": form })))
}

pub async fn reject_amendment(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let form = state
        .engine
        .reservations
        .reject_amendment(principal, id)
        .await?;
    Ok(ok(json!({ "reservationForm": form })))
}

pub async fn document(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let context = state
        .engine
        .documents
        .reservation_context(principal, id)
        .await?;
    Ok(ok(json!({ "document": context })))
}
