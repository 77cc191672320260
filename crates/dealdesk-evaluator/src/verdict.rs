//! Acceptance verdict: PV comparison plus cumulative-payment windows.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dealdesk_core::models::{
    AcceptanceThresholds, ConditionResult, Decision, Evaluation, PlanTotals, PvResult,
    ScheduleEntry,
};

use crate::inputs::PlanInputs;
use crate::pv::{cumulative_through, PV_EPSILON};

fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part / whole * dec!(100)).round_dp(2)
    }
}

fn window(
    name: &str,
    schedule: &[ScheduleEntry],
    totals: &PlanTotals,
    month: u32,
    min: Decimal,
    max: Option<Decimal>,
) -> ConditionResult {
    let actual = percent_of(cumulative_through(schedule, month), totals.total_nominal);
    let passed = actual >= min && max.map(|m| actual <= m).unwrap_or(true);
    ConditionResult {
        name: name.to_string(),
        passed,
        skipped: false,
        actual_percent: actual,
        min_percent: Some(min),
        max_percent: max,
    }
}

fn skipped(name: &str) -> ConditionResult {
    ConditionResult {
        name: name.to_string(),
        passed: true,
        skipped: true,
        actual_percent: Decimal::ZERO,
        min_percent: None,
        max_percent: None,
    }
}

/// Evaluate a schedule against the thresholds. `proposed_pv` and
/// `standard_pv` are both computed at the same monthly rate; the
/// comparison uses the fixed epsilon and the configured tolerance.
pub fn evaluate(
    schedule: &[ScheduleEntry],
    totals: &PlanTotals,
    inputs: &PlanInputs,
    thresholds: &AcceptanceThresholds,
    proposed_pv: f64,
    standard_pv: f64,
    used_stored_fm_pv: bool,
) -> Evaluation {
    let tolerance = rust_decimal::prelude::ToPrimitive::to_f64(&thresholds.pv_tolerance_percent)
        .unwrap_or(100.0);
    let pv_passed = proposed_pv + PV_EPSILON >= standard_pv * tolerance / 100.0;
    let pv = PvResult {
        proposed_pv,
        standard_pv,
        tolerance_percent: thresholds.pv_tolerance_percent,
        passed: pv_passed,
        used_stored_fm_pv,
    };

    let mut conditions = vec![
        window(
            "cumulative_y1",
            schedule,
            totals,
            12,
            thresholds.year_1_min_percent,
            thresholds.year_1_max_percent,
        ),
        window(
            "cumulative_y2",
            schedule,
            totals,
            24,
            thresholds.year_2_min_percent,
            thresholds.year_2_max_percent,
        ),
        window(
            "cumulative_y3",
            schedule,
            totals,
            36,
            thresholds.year_3_min_percent,
            thresholds.year_3_max_percent,
        ),
    ];

    // The handover window only constrains plans that actually carry a
    // handover payment; without one the year windows govern.
    let handover = match inputs.handover_year {
        Some(year) if inputs.additional_handover_payment > Decimal::ZERO => window(
            "cumulative_handover",
            schedule,
            totals,
            12 * year,
            thresholds.handover_min_percent,
            thresholds.handover_max_percent,
        ),
        _ => skipped("cumulative_handover"),
    };
    conditions.push(handover);

    let all_passed = pv_passed && conditions.iter().all(|c| c.passed);
    Evaluation {
        decision: if all_passed {
            Decision::Accept
        } else {
            Decision::Reject
        },
        pv,
        conditions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{DpType, Frequency, MaintenanceDeposit, StdPlan};
    use crate::schedule::build_schedule;
    use dealdesk_core::models::EntryKind;

    fn inputs(handover_payment: Decimal) -> PlanInputs {
        PlanInputs {
            mode: None,
            sales_discount_percent: Decimal::ZERO,
            dp_type: DpType::Percentage,
            down_payment_value: dec!(20),
            plan_duration_years: 4,
            installment_frequency: Frequency::Quarterly,
            handover_year: Some(2),
            additional_handover_payment: handover_payment,
            split_first_year_payments: false,
            first_year_payments: vec![],
            subsequent_years: vec![],
            maintenance_deposit: MaintenanceDeposit::default(),
            start_date: None,
        }
    }

    fn std_plan() -> StdPlan {
        StdPlan {
            total_price: dec!(1_000_000),
            annual_rate_percent: dec!(12),
            standard_pv: None,
        }
    }

    #[test]
    fn test_condition_windows_on_quarterly_plan() {
        let inputs = inputs(Decimal::ZERO);
        let (schedule, totals) = build_schedule(&std_plan(), &inputs, None).unwrap();
        let eval = evaluate(
            &schedule,
            &totals,
            &inputs,
            &AcceptanceThresholds::default(),
            1_000_000.0,
            1_000_000.0,
            false,
        );

        assert_eq!(eval.decision, Decision::Accept);
        let y1 = &eval.conditions[0];
        assert_eq!(y1.name, "cumulative_y1");
        assert_eq!(y1.actual_percent, dec!(40));
        assert!(y1.passed);
        assert_eq!(eval.conditions[1].actual_percent, dec!(60));
        assert_eq!(eval.conditions[2].actual_percent, dec!(80));
        // no handover payment: window recorded as skipped, not failed
        assert!(eval.conditions[3].skipped);
    }

    #[test]
    fn test_handover_window_enforced_when_payment_present() {
        let inputs = inputs(dec!(50_000));
        let (schedule, totals) = build_schedule(&std_plan(), &inputs, None).unwrap();
        let eval = evaluate(
            &schedule,
            &totals,
            &inputs,
            &AcceptanceThresholds::default(),
            1_000_000.0,
            1_000_000.0,
            false,
        );
        let handover = &eval.conditions[3];
        assert!(!handover.skipped);
        // DP 200k + 8 x 46,875 + handover 50k = 625k of 1m: 62.5%
        assert_eq!(handover.actual_percent, dec!(62.5));
        assert!(!handover.passed);
        assert_eq!(eval.decision, Decision::Reject);
    }

    #[test]
    fn test_pv_tolerance_and_epsilon() {
        let inputs = inputs(Decimal::ZERO);
        let (schedule, totals) = build_schedule(&std_plan(), &inputs, None).unwrap();
        let thresholds = AcceptanceThresholds::default();

        // just inside epsilon
        let eval = evaluate(
            &schedule,
            &totals,
            &inputs,
            &thresholds,
            999_999.995,
            1_000_000.0,
            false,
        );
        assert!(eval.pv.passed);

        // clearly below
        let eval = evaluate(
            &schedule,
            &totals,
            &inputs,
            &thresholds,
            999_000.0,
            1_000_000.0,
            false,
        );
        assert!(!eval.pv.passed);
        assert_eq!(eval.decision, Decision::Reject);
    }

    #[test]
    fn test_ceiling_bound_rejects() {
        let inputs = inputs(Decimal::ZERO);
        let (schedule, totals) = build_schedule(&std_plan(), &inputs, None).unwrap();
        let mut thresholds = AcceptanceThresholds::default();
        thresholds.year_1_max_percent = Some(dec!(39));
        let eval = evaluate(
            &schedule,
            &totals,
            &inputs,
            &thresholds,
            1_000_000.0,
            1_000_000.0,
            false,
        );
        // 40% paid in year 1 exceeds the 39% ceiling
        assert!(!eval.conditions[0].passed);
        assert_eq!(eval.decision, Decision::Reject);
    }

    #[test]
    fn test_maintenance_ignored_by_conditions() {
        let mut inputs = inputs(Decimal::ZERO);
        inputs.maintenance_deposit.amount = dec!(500_000);
        inputs.maintenance_deposit.month = Some(1);
        let (schedule, totals) = build_schedule(&std_plan(), &inputs, None).unwrap();
        assert!(schedule
            .iter()
            .any(|e| e.kind == EntryKind::MaintenanceDeposit));
        let eval = evaluate(
            &schedule,
            &totals,
            &inputs,
            &AcceptanceThresholds::default(),
            1_000_000.0,
            1_000_000.0,
            false,
        );
        // y1 cumulative stays at 40% despite the huge month-1 deposit
        assert_eq!(eval.conditions[0].actual_percent, dec!(40));
    }
}
