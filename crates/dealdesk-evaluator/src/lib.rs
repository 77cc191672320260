//! # dealdesk-evaluator
//!
//! Pure, deterministic financial plan evaluator. Given the FM standard
//! plan and a proposal, builds the payment schedule, computes its present
//! value and produces an ACCEPT/REJECT verdict against the configured
//! acceptance thresholds.
//!
//! The evaluator performs no I/O, reads no clock and draws no randomness:
//! identical inputs produce bit-identical output.

pub mod dated;
pub mod inputs;
pub mod pv;
pub mod schedule;
pub mod verdict;

use serde::{Deserialize, Serialize};

use dealdesk_core::models::{Evaluation, PlanTotals, ScheduleEntry};
use dealdesk_core::models::AcceptanceThresholds;
use dealdesk_core::DealdeskResult;

pub use dated::{with_due_dates, DateForm, DatedEntry};
pub use inputs::{
    validate, DpType, FirstYearPayment, FirstYearPaymentType, Frequency, MaintenanceDeposit,
    PlanInputs, PlanMode, StdPlan, SubsequentYear,
};
pub use pv::PV_EPSILON;
pub use schedule::build_schedule;

/// Complete evaluator output for one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub schedule: Vec<ScheduleEntry>,
    pub totals: PlanTotals,
    pub evaluation: Evaluation,
}

/// Recompute the standard PV: the present value of the undiscounted
/// standard-mode rendition of the same plan shape. Falls back to the
/// stored FM value only when recomputation is impossible.
fn resolve_standard_pv(std_plan: &StdPlan, inputs: &PlanInputs) -> (f64, bool) {
    let baseline_inputs = PlanInputs {
        mode: Some(PlanMode::Standard),
        sales_discount_percent: rust_decimal::Decimal::ZERO,
        split_first_year_payments: false,
        first_year_payments: Vec::new(),
        subsequent_years: Vec::new(),
        ..inputs.clone()
    };

    let rate = pv::monthly_rate(std_plan.annual_rate_percent);
    match schedule::build_schedule(std_plan, &baseline_inputs, None) {
        Ok((baseline, _)) => (pv::present_value(&baseline, rate), false),
        Err(_) => (std_plan.standard_pv.unwrap_or(0.0), true),
    }
}

/// Validate inputs, build the schedule and evaluate it.
///
/// This is the single entry point used by the HTTP surface and by plan
/// creation; both `/calculate` and persisted snapshots carry its output.
pub fn evaluate_plan(
    std_plan: &StdPlan,
    inputs: &PlanInputs,
    thresholds: &AcceptanceThresholds,
) -> DealdeskResult<PlanOutcome> {
    inputs::validate(std_plan, inputs)?;

    let (standard_pv, used_stored_fm_pv) = resolve_standard_pv(std_plan, inputs);

    let pv_target = match inputs.mode() {
        PlanMode::TargetPv => {
            let tolerance = rust_decimal::prelude::ToPrimitive::to_f64(
                &thresholds.pv_tolerance_percent,
            )
            .unwrap_or(100.0);
            Some(standard_pv * tolerance / 100.0)
        }
        _ => None,
    };

    let (schedule, totals) = schedule::build_schedule(std_plan, inputs, pv_target)?;

    let rate = pv::monthly_rate(std_plan.annual_rate_percent);
    let proposed_pv = pv::present_value(&schedule, rate);

    let evaluation = verdict::evaluate(
        &schedule,
        &totals,
        inputs,
        thresholds,
        proposed_pv,
        standard_pv,
        used_stored_fm_pv,
    );

    Ok(PlanOutcome {
        schedule,
        totals,
        evaluation,
    })
}
