//! Block endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use dealdesk_engine::BlockRequest;

use crate::auth::AuthPrincipal;
use crate::envelope::{ok, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequestBody {
    pub unit_id: Uuid,
    pub duration_days: i32,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub payment_plan_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendBody {
    pub additional_days: i32,
}

pub async fn request(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(body): Json<BlockRequestBody>,
) -> ApiResult<Json<Value>> {
    let block = state
        .engine
        .blocks
        .request(
            principal,
            BlockRequest {
                unit_id: body.unit_id,
                duration_days: body.duration_days,
                reason: body.reason,
                payment_plan_id: body.payment_plan_id,
            },
        )
        .await?;
    Ok(ok(json!({ "block": block })))
}

pub async fn approve(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let block = state.engine.blocks.approve(principal, id).await?;
    Ok(ok(json!({ "block": block })))
}

pub async fn reject(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let block = state.engine.blocks.reject(principal, id).await?;
    Ok(ok(json!({ "block": block })))
}

pub async fn extend(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(body): Json<ExtendBody>,
) -> ApiResult<Json<Value>> {
    let block = state
        .engine
        .blocks
        .extend(principal, id, body.additional_days)
        .await?;
    Ok(ok(json!({ "block": block })))
}

pub async fn cancel(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let block = state.engine.blocks.cancel(principal, id).await?;
    Ok(ok(json!({ "block": block })))
}

/// The stage cleared is derived from the caller's role, so one handler
/// serves the override-sm/-fm/-tm routes.
pub async fn override_approve(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let block = state.engine.blocks.override_approve(principal, id).await?;
    Ok(ok(json!({ "block": block })))
}

pub async fn override_reject(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let block = state.engine.blocks.override_reject(principal, id).await?;
    Ok(ok(json!({ "block": block })))
}
