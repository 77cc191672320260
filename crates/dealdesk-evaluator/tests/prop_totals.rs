//! Property tests over schedule construction.

use proptest::prelude::*;
use rust_decimal::Decimal;

use dealdesk_core::models::AcceptanceThresholds;
use dealdesk_evaluator::{
    evaluate_plan, DpType, Frequency, MaintenanceDeposit, PlanInputs, StdPlan,
};

fn inputs(dp_percent: u32, years: u32, frequency: Frequency) -> PlanInputs {
    PlanInputs {
        mode: None,
        sales_discount_percent: Decimal::ZERO,
        dp_type: DpType::Percentage,
        down_payment_value: Decimal::from(dp_percent),
        plan_duration_years: years,
        installment_frequency: frequency,
        handover_year: None,
        additional_handover_payment: Decimal::ZERO,
        split_first_year_payments: false,
        first_year_payments: vec![],
        subsequent_years: vec![],
        maintenance_deposit: MaintenanceDeposit::default(),
        start_date: None,
    }
}

proptest! {
    /// Standard-mode schedules always add up to the discounted price,
    /// regardless of shape, and stay chronologically ordered.
    #[test]
    fn standard_schedule_conserves_total(
        total in 100_000u64..10_000_000,
        dp_percent in 0u32..=60,
        years in 1u32..=12,
        freq_idx in 0usize..4,
    ) {
        let frequency = [
            Frequency::Monthly,
            Frequency::Quarterly,
            Frequency::BiAnnually,
            Frequency::Annually,
        ][freq_idx];
        let std_plan = StdPlan {
            total_price: Decimal::from(total),
            annual_rate_percent: Decimal::from(12u32),
            standard_pv: None,
        };
        let outcome = evaluate_plan(
            &std_plan,
            &inputs(dp_percent, years, frequency),
            &AcceptanceThresholds::default(),
        )
        .unwrap();

        prop_assert_eq!(outcome.totals.total_nominal, Decimal::from(total));
        prop_assert_eq!(
            outcome.totals.installment_count,
            years * frequency.per_year()
        );
        let months: Vec<u32> = outcome.schedule.iter().map(|e| e.month_offset).collect();
        let mut sorted = months.clone();
        sorted.sort_unstable();
        prop_assert_eq!(months, sorted);
    }
}
