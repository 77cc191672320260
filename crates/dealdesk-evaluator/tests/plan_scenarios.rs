//! End-to-end evaluator scenarios over realistic plan shapes.

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dealdesk_core::models::{AcceptanceThresholds, Decision, EntryKind};
use dealdesk_evaluator::{
    evaluate_plan, DpType, FirstYearPayment, FirstYearPaymentType, Frequency, MaintenanceDeposit,
    PlanInputs, PlanMode, StdPlan,
};

fn std_plan() -> StdPlan {
    StdPlan {
        total_price: dec!(1_000_000),
        annual_rate_percent: dec!(12),
        standard_pv: Some(1_000_000.0),
    }
}

fn happy_path_inputs() -> PlanInputs {
    PlanInputs {
        mode: None,
        sales_discount_percent: Decimal::ZERO,
        dp_type: DpType::Percentage,
        down_payment_value: dec!(20),
        plan_duration_years: 4,
        installment_frequency: Frequency::Quarterly,
        handover_year: Some(2),
        additional_handover_payment: Decimal::ZERO,
        split_first_year_payments: false,
        first_year_payments: vec![],
        subsequent_years: vec![],
        maintenance_deposit: MaintenanceDeposit::default(),
        start_date: None,
    }
}

#[test]
fn happy_path_quarterly_plan_accepts() {
    let outcome = evaluate_plan(
        &std_plan(),
        &happy_path_inputs(),
        &AcceptanceThresholds::default(),
    )
    .unwrap();

    // 1 down payment of 200,000 at month 0
    let dp = &outcome.schedule[0];
    assert_eq!(dp.kind, EntryKind::DownPayment);
    assert_eq!(dp.month_offset, 0);
    assert_eq!(dp.amount, dec!(200_000));

    // 16 equal installments of 50,000 at months 3, 6, ..., 48
    let installments: Vec<_> = outcome
        .schedule
        .iter()
        .filter(|e| e.kind == EntryKind::Installment)
        .collect();
    assert_eq!(installments.len(), 16);
    for (i, entry) in installments.iter().enumerate() {
        assert_eq!(entry.month_offset, 3 * (i as u32 + 1));
        assert_eq!(entry.amount, dec!(50_000));
    }

    assert_eq!(outcome.evaluation.decision, Decision::Accept);
    let y1 = outcome
        .evaluation
        .conditions
        .iter()
        .find(|c| c.name == "cumulative_y1")
        .unwrap();
    assert!(y1.actual_percent >= dec!(35));
}

#[test]
fn evaluator_is_pure() {
    let a = evaluate_plan(
        &std_plan(),
        &happy_path_inputs(),
        &AcceptanceThresholds::default(),
    )
    .unwrap();
    let b = evaluate_plan(
        &std_plan(),
        &happy_path_inputs(),
        &AcceptanceThresholds::default(),
    )
    .unwrap();
    assert_eq!(a, b);
    // bit-for-bit through serialization as well
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn zero_discount_default_plan_passes_pv() {
    // a plan generated with no discount and all defaults must satisfy
    // PV >= standard PV
    let outcome = evaluate_plan(
        &std_plan(),
        &happy_path_inputs(),
        &AcceptanceThresholds::default(),
    )
    .unwrap();
    assert!(outcome.evaluation.pv.passed);
    assert!(!outcome.evaluation.pv.used_stored_fm_pv);
    assert!(
        outcome.evaluation.pv.proposed_pv + 0.01 >= outcome.evaluation.pv.standard_pv,
        "proposed {} vs standard {}",
        outcome.evaluation.pv.proposed_pv,
        outcome.evaluation.pv.standard_pv
    );
}

#[test]
fn discounted_back_loaded_plan_fails_pv() {
    let mut inputs = happy_path_inputs();
    inputs.sales_discount_percent = dec!(10);
    let outcome = evaluate_plan(&std_plan(), &inputs, &AcceptanceThresholds::default()).unwrap();
    // 10% off with the same shape cannot reach the undiscounted PV
    assert!(!outcome.evaluation.pv.passed);
    assert_eq!(outcome.evaluation.decision, Decision::Reject);
}

#[test]
fn front_loaded_year_one_fails_when_below_threshold() {
    let mut inputs = happy_path_inputs();
    // tiny DP and annual installments: year 1 carries only 10% + 22.5%
    inputs.down_payment_value = dec!(10);
    inputs.installment_frequency = Frequency::Annually;
    let outcome = evaluate_plan(&std_plan(), &inputs, &AcceptanceThresholds::default()).unwrap();
    let y1 = outcome
        .evaluation
        .conditions
        .iter()
        .find(|c| c.name == "cumulative_y1")
        .unwrap();
    assert_eq!(y1.actual_percent, dec!(32.5));
    assert!(!y1.passed);
    assert_eq!(outcome.evaluation.decision, Decision::Reject);
}

#[test]
fn split_first_year_schedule_and_verdict() {
    let mut inputs = happy_path_inputs();
    inputs.split_first_year_payments = true;
    inputs.first_year_payments = vec![
        FirstYearPayment {
            amount: dec!(150_000),
            month: 1,
            payment_type: FirstYearPaymentType::Dp,
        },
        FirstYearPayment {
            amount: dec!(100_000),
            month: 7,
            payment_type: FirstYearPaymentType::Regular,
        },
    ];
    let outcome = evaluate_plan(&std_plan(), &inputs, &AcceptanceThresholds::default()).unwrap();

    // no month-0 entry when the first year is split
    assert!(outcome.schedule.iter().all(|e| e.month_offset > 0));
    assert_eq!(outcome.totals.down_payment_total, dec!(150_000));
    assert_eq!(outcome.totals.grand_total, dec!(1_000_000));

    // 250k explicit + 4 x 46,875 in year 1 = 437.5k -> 43.75%
    let y1 = outcome
        .evaluation
        .conditions
        .iter()
        .find(|c| c.name == "cumulative_y1")
        .unwrap();
    assert_eq!(y1.actual_percent, dec!(43.75));
}

#[test]
fn target_pv_mode_closes_the_gap() {
    let mut inputs = happy_path_inputs();
    inputs.mode = Some(PlanMode::TargetPv);
    inputs.sales_discount_percent = dec!(5);
    let outcome = evaluate_plan(&std_plan(), &inputs, &AcceptanceThresholds::default()).unwrap();

    // the resolver levels installments so the proposal meets the target
    assert!(outcome.evaluation.pv.passed);
    // nominal total exceeds the discounted price: the buyer pays for time
    assert!(outcome.totals.total_nominal > dec!(950_000));
}

#[test]
fn handover_year_unset_skips_handover_artifacts() {
    let mut inputs = happy_path_inputs();
    inputs.handover_year = None;
    inputs.additional_handover_payment = dec!(100_000);
    inputs.maintenance_deposit.amount = dec!(25_000);
    let outcome = evaluate_plan(&std_plan(), &inputs, &AcceptanceThresholds::default()).unwrap();

    // no handover entry without a handover year
    assert!(outcome
        .schedule
        .iter()
        .all(|e| e.kind != EntryKind::Handover));
    // maintenance falls back to month 12
    let md = outcome
        .schedule
        .iter()
        .find(|e| e.kind == EntryKind::MaintenanceDeposit)
        .unwrap();
    assert_eq!(md.month_offset, 12);
    // handover window skipped
    let handover = outcome
        .evaluation
        .conditions
        .iter()
        .find(|c| c.name == "cumulative_handover")
        .unwrap();
    assert!(handover.skipped);
}

#[test]
fn invalid_inputs_report_every_field() {
    let mut inputs = happy_path_inputs();
    inputs.plan_duration_years = 0;
    inputs.down_payment_value = dec!(-1);
    let err = evaluate_plan(&std_plan(), &inputs, &AcceptanceThresholds::default()).unwrap_err();
    let details = err.field_details().expect("field detail list");
    let fields: Vec<&str> = details.iter().map(|d| d.field.as_str()).collect();
    assert!(fields.contains(&"inputs.planDurationYears"));
    assert!(fields.contains(&"inputs.downPaymentValue"));
}
