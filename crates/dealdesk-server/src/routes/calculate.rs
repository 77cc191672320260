//! Calculation endpoints: score a proposal, or generate the dated,
//! written-amount schedule for documents.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use dealdesk_core::{DealdeskError, DealdeskResult};
use dealdesk_engine::policy;
use dealdesk_evaluator::{evaluate_plan, with_due_dates, PlanInputs, PlanMode, PlanOutcome, StdPlan};
use dealdesk_store::{repo, SqlxResultExt};

use crate::auth::AuthPrincipal;
use crate::envelope::{ok, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    #[serde(default)]
    pub mode: Option<PlanMode>,
    #[serde(default)]
    pub std_plan: Option<StdPlan>,
    /// Unit whose FM standard plan configuration to use instead of an
    /// inline `stdPlan`
    #[serde(default, alias = "standardPricingId")]
    pub unit_id: Option<Uuid>,
    pub inputs: PlanInputs,
}

struct Resolved {
    std_plan: StdPlan,
    inputs: PlanInputs,
}

/// Resolve the standard plan from the request: inline, or from the
/// referenced unit's stored pricing.
async fn resolve(state: &AppState, request: CalculateRequest) -> DealdeskResult<Resolved> {
    let mut inputs = request.inputs;
    if request.mode.is_some() {
        inputs.mode = request.mode;
    }

    let std_plan = match (request.std_plan, request.unit_id) {
        (Some(std_plan), _) => std_plan,
        (None, Some(unit_id)) => {
            let mut conn = state.pool.acquire().await.db()?;
            let unit = repo::units::find_row_by_id(&mut conn, unit_id)
                .await?
                .ok_or_else(|| DealdeskError::not_found("Unit"))?;
            let annual_rate_percent = unit.annual_rate_percent.ok_or_else(|| {
                DealdeskError::config_missing(
                    "Standard plan configuration is missing for this unit",
                )
            })?;
            let total_price = unit.base_price
                + unit.garden_price
                + unit.roof_price
                + unit.storage_price
                + unit.garage_price;
            if inputs.maintenance_deposit.amount.is_zero() {
                inputs.maintenance_deposit.amount = unit.maintenance_price;
            }
            StdPlan {
                total_price,
                annual_rate_percent,
                standard_pv: unit.standard_pv,
            }
        }
        (None, None) => {
            return Err(DealdeskError::invalid_field(
                "stdPlan",
                "Either stdPlan or unitId is required",
            ))
        }
    };

    Ok(Resolved { std_plan, inputs })
}

async fn run(state: &AppState, request: CalculateRequest) -> DealdeskResult<(PlanOutcome, PlanInputs)> {
    let resolved = resolve(state, request).await?;
    let mut conn = state.pool.acquire().await.db()?;
    let active = policy::active_policy(&mut conn).await?;
    let outcome = evaluate_plan(&resolved.std_plan, &resolved.inputs, &active.thresholds)?;
    Ok((outcome, resolved.inputs))
}

/// `POST /api/calculate`
pub async fn calculate(
    State(state): State<AppState>,
    _principal: AuthPrincipal,
    Json(request): Json<CalculateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let (outcome, _) = run(&state, request).await?;
    let meta = json!({ "usedStoredFmPv": outcome.evaluation.pv.used_stored_fm_pv });
    Ok(ok(json!({ "data": outcome, "meta": meta })))
}

/// `POST /api/generate-plan`: the same calculation, decorated with due
/// dates and written amounts for document rendering.
pub async fn generate_plan(
    State(state): State<AppState>,
    _principal: AuthPrincipal,
    Json(request): Json<CalculateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let (outcome, inputs) = run(&state, request).await?;
    let start_date = inputs.start_date.unwrap_or_else(|| Utc::now().date_naive());
    let dated = with_due_dates(&outcome.schedule, start_date, &state.config.currency);
    Ok(ok(json!({
        "data": {
            "schedule": dated,
            "totals": outcome.totals,
            "evaluation": outcome.evaluation,
        },
        "meta": { "startDate": start_date },
    })))
}
