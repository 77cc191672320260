//! Payment plan endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use dealdesk_core::models::{BuyerInfo, UnitInfo};
use dealdesk_core::DealdeskError;
use dealdesk_engine::{CreatePlanRequest, QueueStage};
use dealdesk_evaluator::{PlanInputs, StdPlan};
use dealdesk_store::{repo, SqlxResultExt};

use crate::auth::AuthPrincipal;
use crate::envelope::{ok, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanBody {
    pub deal_id: Uuid,
    #[serde(default)]
    pub std_plan: Option<StdPlan>,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    pub inputs: PlanInputs,
    #[serde(default)]
    pub buyers: Vec<BuyerInfo>,
}

pub async fn create(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(body): Json<CreatePlanBody>,
) -> ApiResult<Json<Value>> {
    // resolve pricing and unit facts before entering the engine
    let (std_plan, unit) = match (body.std_plan, body.unit_id) {
        (Some(std_plan), None) => (std_plan, None),
        (std_plan, Some(unit_id)) => {
            let mut conn = state.pool.acquire().await.db()?;
            let row = repo::units::find_row_by_id(&mut conn, unit_id)
                .await?
                .ok_or_else(|| DealdeskError::not_found("Unit"))?;
            let total_price = row.base_price
                + row.garden_price
                + row.roof_price
                + row.storage_price
                + row.garage_price;
            let resolved_std = match std_plan {
                Some(s) => s,
                None => StdPlan {
                    total_price,
                    annual_rate_percent: row.annual_rate_percent.ok_or_else(|| {
                        DealdeskError::config_missing(
                            "Standard plan configuration is missing for this unit",
                        )
                    })?,
                    standard_pv: row.standard_pv,
                },
            };
            let unit_info = UnitInfo {
                unit_id: row.id,
                code: row.code,
                total_price,
            };
            (resolved_std, Some(unit_info))
        }
        (None, None) => {
            return Err(DealdeskError::invalid_field(
                "stdPlan",
                "Either stdPlan or unitId is required",
            )
            .into())
        }
    };

    let (plan, outcome) = state
        .engine
        .plans
        .create(
            principal,
            CreatePlanRequest {
                deal_id: body.deal_id,
                std_plan,
                inputs: body.inputs,
                buyers: body.buyers,
                unit,
            },
        )
        .await?;
    Ok(ok(json!({ "plan": plan, "evaluation": outcome.evaluation })))
}

pub async fn queue(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(stage): Path<String>,
) -> ApiResult<Json<Value>> {
    let stage = match stage.as_str() {
        "sm" => QueueStage::Sm,
        "fm" => QueueStage::Fm,
        "tm" => QueueStage::Tm,
        other => {
            return Err(DealdeskError::invalid_field(
                "stage",
                format!("Unknown queue '{other}'"),
            )
            .into())
        }
    };
    let plans = state.engine.plans.queue(principal, stage).await?;
    Ok(ok(json!({ "plans": plans })))
}

pub async fn approve_sm(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let plan = state.engine.plans.approve_sm(principal, id).await?;
    Ok(ok(json!({ "plan": plan })))
}

/// FM approval; the response carries the escalation outcome.
pub async fn approve_fm(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let decision = state.engine.plans.approve_fm(principal, id).await?;
    Ok(ok(json!({
        "plan": decision.plan,
        "escalated": decision.escalated,
        "policyLimitPercent": decision.policy_limit_percent,
    })))
}

pub async fn approve_tm(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let plan = state.engine.plans.approve_tm(principal, id).await?;
    Ok(ok(json!({ "plan": plan })))
}

pub async fn reject(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let plan = state.engine.plans.reject(principal, id).await?;
    Ok(ok(json!({ "plan": plan })))
}

pub async fn mark_accepted(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let plan = state.engine.plans.mark_accepted(principal, id).await?;
    Ok(ok(json!({ "plan": plan })))
}
