//! Contract endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use chrono::NaiveDate;
use dealdesk_core::models::ContractSettings;

use crate::auth::AuthPrincipal;
use crate::envelope::{ok, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractBody {
    pub reservation_form_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsBody {
    #[serde(default)]
    pub contract_date: Option<NaiveDate>,
    #[serde(default)]
    pub power_of_attorney: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(body): Json<CreateContractBody>,
) -> ApiResult<Json<Value>> {
    let contract = state
        .engine
        .contracts
        .create(principal, body.reservation_form_id)
        .await?;
    Ok(ok(json!({ "contract": contract })))
}

pub async fn update_settings(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(body): Json<SettingsBody>,
) -> ApiResult<Json<Value>> {
    let contract = state
        .engine
        .contracts
        .update_settings(
            principal,
            id,
            ContractSettings {
                contract_date: body.contract_date,
                power_of_attorney: body.power_of_attorney,
            },
        )
        .await?;
    Ok(ok(json!({ "contract": contract })))
}

pub async fn lock_settings(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let contract = state.engine.contracts.lock_settings(principal, id).await?;
    Ok(ok(json!({ "contract": contract })))
}

pub async fn submit(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let contract = state.engine.contracts.submit(principal, id).await?;
    Ok(ok(json!({ "contract": contract })))
}

pub async fn approve_cm(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let contract = state.engine.contracts.approve_cm(principal, id).await?;
    Ok(ok(json!({ "contract": contract })))
}

pub async fn approve_tm(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let contract = state.engine.contracts.approve_tm(principal, id).await?;
    Ok(ok(json!({ "contract": contract })))
}

pub async fn reject(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let contract = state.engine.contracts.reject(principal, id).await?;
    Ok(ok(json!({ "contract": contract })))
}

pub async fn execute(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let contract = state.engine.contracts.execute(principal, id).await?;
    Ok(ok(json!({ "contract": contract })))
}

pub async fn document(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let context = state
        .engine
        .documents
        .contract_context(principal, id)
        .await?;
    Ok(ok(json!({ "document": context })))
}
