//! Deal endpoints.

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use dealdesk_engine::CreateDealRequest;

use crate::auth::AuthPrincipal;
use crate::envelope::{ok, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealBody {
    pub title: String,
    pub amount: Decimal,
    /// Calculator snapshot, stored opaque and decoded at every read
    pub details: Value,
}

pub async fn create(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(body): Json<CreateDealBody>,
) -> ApiResult<Json<Value>> {
    let deal = state
        .engine
        .deals
        .create(
            principal,
            CreateDealRequest {
                title: body.title,
                amount: body.amount,
                details: body.details,
            },
        )
        .await?;
    Ok(ok(json!({ "deal": deal })))
}

pub async fn submit(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let deal = state.engine.deals.submit(principal, id).await?;
    Ok(ok(json!({ "deal": deal })))
}

pub async fn approve(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let deal = state.engine.deals.approve(principal, id).await?;
    Ok(ok(json!({ "deal": deal })))
}

pub async fn reject(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let deal = state.engine.deals.reject(principal, id).await?;
    Ok(ok(json!({ "deal": deal })))
}

pub async fn approve_override(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let deal = state.engine.deals.approve_override(principal, id).await?;
    Ok(ok(json!({ "deal": deal })))
}
