//! Schedule construction.
//!
//! Builds the dated entry list for a proposal: down payment (or the
//! verbatim first-year split), per-year installments, handover payment,
//! maintenance deposit, and the equal-installment resolver for the
//! target-PV mode.

use chrono::Datelike;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dealdesk_core::models::{EntryKind, PlanTotals, ScheduleEntry};
use dealdesk_core::{DealdeskError, DealdeskResult};

use crate::inputs::{DpType, FirstYearPaymentType, PlanInputs, PlanMode, StdPlan};
use crate::pv::{discount_factor, monthly_rate};

/// Month offset of installment `j` (1-based) of year `k` (1-based) at
/// `n` installments per year: first at `12k - 12 + 12/n`, then stride
/// `12/n`.
fn installment_month(year: u32, n: u32, j: u32) -> u32 {
    let stride = 12 / n;
    12 * year - 12 + stride * j
}

/// Whole months from `start` to `date`, clamped at zero.
fn months_between(start: chrono::NaiveDate, date: chrono::NaiveDate) -> u32 {
    let diff =
        (date.year() - start.year()) * 12 + date.month() as i32 - start.month() as i32;
    diff.max(0) as u32
}

/// Split `total` into `count` level parts rounded to 2 decimals, the
/// last part absorbing the rounding remainder.
fn level_amounts(total: Decimal, count: u32) -> Vec<Decimal> {
    if count == 0 {
        return Vec::new();
    }
    let level = (total / Decimal::from(count)).round_dp(2);
    let mut amounts = vec![level; count as usize];
    let last = (total - level * Decimal::from(count - 1)).round_dp(2);
    amounts[count as usize - 1] = last;
    amounts
}

struct DiscreteEntries {
    entries: Vec<ScheduleEntry>,
    /// Months already carrying a discrete payment; the resolver skips them
    occupied_months: Vec<u32>,
}

/// Emit the entries that do not depend on the generation mode.
fn build_discrete(std_plan: &StdPlan, inputs: &PlanInputs) -> DealdeskResult<DiscreteEntries> {
    let effective_total = inputs.effective_total(std_plan.total_price);
    let mut entries = Vec::new();
    let mut occupied = Vec::new();

    if inputs.split_first_year_payments {
        for p in &inputs.first_year_payments {
            let kind = match p.payment_type {
                FirstYearPaymentType::Dp => EntryKind::DownPayment,
                FirstYearPaymentType::Regular => EntryKind::Installment,
            };
            let label = match p.payment_type {
                FirstYearPaymentType::Dp => format!("Down Payment (Month {})", p.month),
                FirstYearPaymentType::Regular => format!("First Year Payment (Month {})", p.month),
            };
            entries.push(ScheduleEntry::new(label, p.month, p.amount.round_dp(2), kind));
            occupied.push(p.month);
        }
    } else {
        let dp = match inputs.dp_type {
            DpType::Percentage => {
                (effective_total * inputs.down_payment_value / dec!(100)).round_dp(2)
            }
            DpType::Amount => inputs.down_payment_value.round_dp(2),
        };
        if dp > effective_total {
            return Err(DealdeskError::invalid_field(
                "inputs.downPaymentValue",
                "Down payment exceeds the discounted total price",
            ));
        }
        entries.push(ScheduleEntry::new(
            "Down Payment",
            0,
            dp,
            EntryKind::DownPayment,
        ));
        occupied.push(0);
    }

    // Handover entry only when both the year and the amount are positive.
    if let Some(year) = inputs.handover_year {
        if inputs.additional_handover_payment > Decimal::ZERO {
            let month = 12 * year;
            entries.push(ScheduleEntry::new(
                "Handover Payment",
                month,
                inputs.additional_handover_payment.round_dp(2),
                EntryKind::Handover,
            ));
            occupied.push(month);
        }
    }

    // Maintenance deposit month: explicit date, else explicit month,
    // else handover, else month 12.
    if inputs.maintenance_deposit.amount > Decimal::ZERO {
        let month = match (
            inputs.maintenance_deposit.date,
            inputs.start_date,
            inputs.maintenance_deposit.month,
        ) {
            (Some(date), Some(start), _) => months_between(start, date),
            (_, _, Some(month)) => month,
            _ => inputs.handover_year.map(|y| 12 * y).unwrap_or(12),
        };
        entries.push(ScheduleEntry::new(
            "Maintenance Deposit",
            month,
            inputs.maintenance_deposit.amount.round_dp(2),
            EntryKind::MaintenanceDeposit,
        ));
    }

    Ok(DiscreteEntries {
        entries,
        occupied_months: occupied,
    })
}

fn discrete_nominal(entries: &[ScheduleEntry]) -> Decimal {
    entries
        .iter()
        .filter(|e| e.counts_toward_pv())
        .map(|e| e.amount)
        .sum()
}

/// Standard mode: distribute the remainder of the discounted price as
/// level installments over every frequency slot of the horizon.
fn build_standard(
    std_plan: &StdPlan,
    inputs: &PlanInputs,
    discrete: &DiscreteEntries,
) -> DealdeskResult<Vec<ScheduleEntry>> {
    let effective_total = inputs.effective_total(std_plan.total_price);
    let remainder = effective_total - discrete_nominal(&discrete.entries);
    if remainder < Decimal::ZERO {
        return Err(DealdeskError::invalid_field(
            "inputs",
            "Fixed payments exceed the discounted total price",
        ));
    }

    let n = inputs.installment_frequency.per_year();
    let count = inputs.plan_duration_years * n;
    let amounts = level_amounts(remainder, count);

    let mut entries = Vec::with_capacity(count as usize);
    let mut idx = 0usize;
    for year in 1..=inputs.plan_duration_years {
        for j in 1..=n {
            entries.push(ScheduleEntry::new(
                format!("Year {year} Installment {j}"),
                installment_month(year, n, j),
                amounts[idx],
                EntryKind::Installment,
            ));
            idx += 1;
        }
    }
    Ok(entries)
}

/// Custom yearly mode: each supplied year distributes its nominal total
/// across that year's frequency slots. Years start at 2, or at 1 when
/// the first year was split into explicit payments.
fn build_custom_yearly(inputs: &PlanInputs) -> Vec<ScheduleEntry> {
    let start_year = if inputs.split_first_year_payments { 1 } else { 2 };
    let mut entries = Vec::new();
    for (i, year_cfg) in inputs.subsequent_years.iter().enumerate() {
        let year = start_year + i as u32;
        let n = year_cfg.frequency.per_year();
        let amounts = level_amounts(year_cfg.total_nominal, n);
        for (j, amount) in amounts.into_iter().enumerate() {
            entries.push(ScheduleEntry::new(
                format!("Year {} Installment {}", year, j + 1),
                installment_month(year, n, j as u32 + 1),
                amount,
                EntryKind::Installment,
            ));
        }
    }
    entries
}

/// Equal-installment resolver: find the level payment over the free
/// frequency slots that closes the gap between the discrete entries'
/// PV and the target PV.
fn build_target_pv(
    std_plan: &StdPlan,
    inputs: &PlanInputs,
    discrete: &DiscreteEntries,
    target_pv: f64,
) -> Vec<ScheduleEntry> {
    let rate = monthly_rate(std_plan.annual_rate_percent);
    let n = inputs.installment_frequency.per_year();

    let mut months = Vec::new();
    for year in 1..=inputs.plan_duration_years {
        for j in 1..=n {
            let month = installment_month(year, n, j);
            if !discrete.occupied_months.contains(&month) {
                months.push(month);
            }
        }
    }
    if months.is_empty() {
        return Vec::new();
    }

    let discrete_pv = crate::pv::present_value(&discrete.entries, rate);
    let factor_sum: f64 = months
        .iter()
        .map(|&m| 1.0 / discount_factor(rate, m))
        .sum();
    let gap = target_pv - discrete_pv;
    if gap <= 0.0 {
        return Vec::new();
    }

    // round up to the next cent so the resolved PV never lands under
    // the target
    let raw = Decimal::from_f64_retain(gap / factor_sum).unwrap_or(Decimal::ZERO);
    let level = (raw * dec!(100)).ceil() / dec!(100);

    months
        .into_iter()
        .enumerate()
        .map(|(i, month)| {
            ScheduleEntry::new(
                format!("Installment {}", i + 1),
                month,
                level,
                EntryKind::Installment,
            )
        })
        .collect()
}

/// Build the full schedule for a proposal, chronologically ordered.
/// `pv_target` is required by (and only used in) target-PV mode.
pub fn build_schedule(
    std_plan: &StdPlan,
    inputs: &PlanInputs,
    pv_target: Option<f64>,
) -> DealdeskResult<(Vec<ScheduleEntry>, PlanTotals)> {
    let discrete = build_discrete(std_plan, inputs)?;

    let installments = match inputs.mode() {
        PlanMode::Standard => build_standard(std_plan, inputs, &discrete)?,
        PlanMode::CustomYearly => build_custom_yearly(inputs),
        PlanMode::TargetPv => {
            let target = pv_target.ok_or_else(|| {
                DealdeskError::internal("Target-PV mode requires a resolved PV target")
            })?;
            build_target_pv(std_plan, inputs, &discrete, target)
        }
    };

    let mut schedule = discrete.entries;
    schedule.extend(installments);
    schedule.sort_by_key(|e| (e.month_offset, e.kind != EntryKind::DownPayment));

    let grand_total: Decimal = schedule.iter().map(|e| e.amount).sum();
    let total_nominal = discrete_nominal(&schedule);
    let down_payment_total = schedule
        .iter()
        .filter(|e| e.kind == EntryKind::DownPayment)
        .map(|e| e.amount)
        .sum();
    let installment_count = schedule
        .iter()
        .filter(|e| e.kind == EntryKind::Installment)
        .count() as u32;

    let totals = PlanTotals {
        grand_total,
        total_nominal,
        down_payment_total,
        installment_count,
    };
    Ok((schedule, totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{Frequency, MaintenanceDeposit};

    fn std_plan() -> StdPlan {
        StdPlan {
            total_price: dec!(1_000_000),
            annual_rate_percent: dec!(12),
            standard_pv: None,
        }
    }

    fn quarterly_inputs() -> PlanInputs {
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
    fn test_installment_month_formula() {
        // quarterly year 1: 3, 6, 9, 12
        assert_eq!(installment_month(1, 4, 1), 3);
        assert_eq!(installment_month(1, 4, 4), 12);
        // annually year 3: month 36
        assert_eq!(installment_month(3, 1, 1), 36);
        // monthly year 2 starts at month 13
        assert_eq!(installment_month(2, 12, 1), 13);
    }

    #[test]
    fn test_level_amounts_last_absorbs_rounding() {
        let amounts = level_amounts(dec!(100), 3);
        assert_eq!(amounts, vec![dec!(33.33), dec!(33.33), dec!(33.34)]);
        let total: Decimal = amounts.iter().sum();
        assert_eq!(total, dec!(100));
    }

    #[test]
    fn test_standard_quarterly_schedule() {
        let (schedule, totals) = build_schedule(&std_plan(), &quarterly_inputs(), None).unwrap();

        // 1 DP + 16 installments
        assert_eq!(schedule.len(), 17);
        assert_eq!(schedule[0].month_offset, 0);
        assert_eq!(schedule[0].amount, dec!(200_000));
        assert_eq!(schedule[0].kind, EntryKind::DownPayment);

        let months: Vec<u32> = schedule[1..].iter().map(|e| e.month_offset).collect();
        let expected: Vec<u32> = (1..=16).map(|i| 3 * i).collect();
        assert_eq!(months, expected);
        for entry in &schedule[1..] {
            assert_eq!(entry.amount, dec!(50_000));
        }

        assert_eq!(totals.grand_total, dec!(1_000_000));
        assert_eq!(totals.total_nominal, dec!(1_000_000));
        assert_eq!(totals.down_payment_total, dec!(200_000));
        assert_eq!(totals.installment_count, 16);
    }

    #[test]
    fn test_handover_entry_requires_positive_amount() {
        let mut inputs = quarterly_inputs();
        inputs.additional_handover_payment = dec!(0);
        let (schedule, _) = build_schedule(&std_plan(), &inputs, None).unwrap();
        assert!(schedule.iter().all(|e| e.kind != EntryKind::Handover));

        inputs.additional_handover_payment = dec!(100_000);
        let (schedule, _) = build_schedule(&std_plan(), &inputs, None).unwrap();
        let handover = schedule
            .iter()
            .find(|e| e.kind == EntryKind::Handover)
            .unwrap();
        assert_eq!(handover.month_offset, 24);
    }

    #[test]
    fn test_maintenance_month_fallback_chain() {
        let mut inputs = quarterly_inputs();
        inputs.maintenance_deposit = MaintenanceDeposit {
            amount: dec!(30_000),
            date: None,
            month: None,
        };

        // handover year set: falls at 12 * handover_year
        let (schedule, _) = build_schedule(&std_plan(), &inputs, None).unwrap();
        let md = schedule
            .iter()
            .find(|e| e.kind == EntryKind::MaintenanceDeposit)
            .unwrap();
        assert_eq!(md.month_offset, 24);

        // explicit month wins over handover
        inputs.maintenance_deposit.month = Some(6);
        let (schedule, _) = build_schedule(&std_plan(), &inputs, None).unwrap();
        let md = schedule
            .iter()
            .find(|e| e.kind == EntryKind::MaintenanceDeposit)
            .unwrap();
        assert_eq!(md.month_offset, 6);

        // explicit date wins over everything
        inputs.start_date = Some(chrono::NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        inputs.maintenance_deposit.date =
            Some(chrono::NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        let (schedule, _) = build_schedule(&std_plan(), &inputs, None).unwrap();
        let md = schedule
            .iter()
            .find(|e| e.kind == EntryKind::MaintenanceDeposit)
            .unwrap();
        assert_eq!(md.month_offset, 9);

        // no handover year: falls at month 12
        inputs.maintenance_deposit.date = None;
        inputs.maintenance_deposit.month = None;
        inputs.handover_year = None;
        let (schedule, _) = build_schedule(&std_plan(), &inputs, None).unwrap();
        let md = schedule
            .iter()
            .find(|e| e.kind == EntryKind::MaintenanceDeposit)
            .unwrap();
        assert_eq!(md.month_offset, 12);
    }

    #[test]
    fn test_maintenance_in_grand_total_not_nominal() {
        let mut inputs = quarterly_inputs();
        inputs.maintenance_deposit.amount = dec!(30_000);
        let (_, totals) = build_schedule(&std_plan(), &inputs, None).unwrap();
        assert_eq!(totals.grand_total, dec!(1_030_000));
        assert_eq!(totals.total_nominal, dec!(1_000_000));
    }

    #[test]
    fn test_split_first_year_emitted_verbatim() {
        use crate::inputs::FirstYearPayment;
        let mut inputs = quarterly_inputs();
        inputs.split_first_year_payments = true;
        inputs.first_year_payments = vec![
            FirstYearPayment {
                amount: dec!(100_000),
                month: 1,
                payment_type: FirstYearPaymentType::Dp,
            },
            FirstYearPayment {
                amount: dec!(50_000),
                month: 6,
                payment_type: FirstYearPaymentType::Regular,
            },
        ];
        let (schedule, totals) = build_schedule(&std_plan(), &inputs, None).unwrap();
        assert!(schedule.iter().all(|e| e.month_offset != 0));
        assert_eq!(totals.down_payment_total, dec!(100_000));
        // remainder 850k over 16 quarterly slots
        let installments: Vec<&ScheduleEntry> = schedule
            .iter()
            .filter(|e| e.kind == EntryKind::Installment && e.label.starts_with("Year"))
            .collect();
        assert_eq!(installments.len(), 16);
        assert_eq!(installments[0].amount, dec!(53_125));
    }

    #[test]
    fn test_custom_yearly_starts_at_year_two() {
        use crate::inputs::SubsequentYear;
        let mut inputs = quarterly_inputs();
        inputs.mode = Some(PlanMode::CustomYearly);
        inputs.subsequent_years = vec![SubsequentYear {
            total_nominal: dec!(120_000),
            frequency: Frequency::Quarterly,
        }];
        let (schedule, _) = build_schedule(&std_plan(), &inputs, None).unwrap();
        let installments: Vec<&ScheduleEntry> = schedule
            .iter()
            .filter(|e| e.kind == EntryKind::Installment)
            .collect();
        assert_eq!(installments.len(), 4);
        assert_eq!(installments[0].month_offset, 15);
        assert_eq!(installments[0].amount, dec!(30_000));
    }

    #[test]
    fn test_target_pv_resolver_hits_target() {
        let mut inputs = quarterly_inputs();
        inputs.mode = Some(PlanMode::TargetPv);
        let target = 950_000.0;
        let (schedule, _) = build_schedule(&std_plan(), &inputs, Some(target)).unwrap();
        let rate = monthly_rate(dec!(12));
        let pv = crate::pv::present_value(&schedule, rate);
        // level amount is rounded to cents, so allow a small residual
        assert!((pv - target).abs() < 1.0, "pv = {pv}");
    }

    #[test]
    fn test_dp_exceeding_total_rejected() {
        let mut inputs = quarterly_inputs();
        inputs.dp_type = DpType::Amount;
        inputs.down_payment_value = dec!(2_000_000);
        assert!(build_schedule(&std_plan(), &inputs, None).is_err());
    }
}
