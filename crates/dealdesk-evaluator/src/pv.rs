//! Present-value arithmetic.
//!
//! Amounts are emitted as 2-decimal `Decimal`s; PV itself is accumulated
//! in double precision and compared with a fixed epsilon.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use dealdesk_core::models::ScheduleEntry;

/// Epsilon for PV comparisons.
pub const PV_EPSILON: f64 = 0.01;

/// Effective monthly rate for a nominal annual percentage:
/// `(1 + annual/100)^(1/12) - 1`.
pub fn monthly_rate(annual_rate_percent: Decimal) -> f64 {
    let annual = annual_rate_percent.to_f64().unwrap_or(0.0);
    (1.0 + annual / 100.0).powf(1.0 / 12.0) - 1.0
}

/// Discount factor for a payment `month` months out.
pub fn discount_factor(monthly_rate: f64, month: u32) -> f64 {
    (1.0 + monthly_rate).powi(month as i32)
}

/// Present value of a schedule. Maintenance deposits are excluded.
pub fn present_value(entries: &[ScheduleEntry], monthly_rate: f64) -> f64 {
    entries
        .iter()
        .filter(|e| e.counts_toward_pv())
        .map(|e| e.amount.to_f64().unwrap_or(0.0) / discount_factor(monthly_rate, e.month_offset))
        .sum()
}

/// Nominal amount paid through the end of `month`, maintenance excluded.
pub fn cumulative_through(entries: &[ScheduleEntry], month: u32) -> Decimal {
    entries
        .iter()
        .filter(|e| e.counts_toward_pv() && e.month_offset <= month)
        .map(|e| e.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealdesk_core::models::EntryKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zero_rate() {
        assert_eq!(monthly_rate(dec!(0)), 0.0);
        let entries = vec![
            ScheduleEntry::new("DP", 0, dec!(100), EntryKind::DownPayment),
            ScheduleEntry::new("I1", 12, dec!(100), EntryKind::Installment),
        ];
        assert!((present_value(&entries, 0.0) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_twelve_percent_annual() {
        let r = monthly_rate(dec!(12));
        // compounding back up over 12 months must reproduce 12% annual
        assert!(((1.0 + r).powi(12) - 1.12).abs() < 1e-12);
    }

    #[test]
    fn test_maintenance_excluded_from_pv_and_cumulative() {
        let entries = vec![
            ScheduleEntry::new("DP", 0, dec!(500), EntryKind::DownPayment),
            ScheduleEntry::new("MD", 12, dec!(100), EntryKind::MaintenanceDeposit),
        ];
        assert!((present_value(&entries, 0.0) - 500.0).abs() < 1e-9);
        assert_eq!(cumulative_through(&entries, 12), dec!(500));
    }

    #[test]
    fn test_cumulative_respects_month_cutoff() {
        let entries = vec![
            ScheduleEntry::new("a", 3, dec!(10), EntryKind::Installment),
            ScheduleEntry::new("b", 12, dec!(10), EntryKind::Installment),
            ScheduleEntry::new("c", 13, dec!(10), EntryKind::Installment),
        ];
        assert_eq!(cumulative_through(&entries, 12), dec!(20));
    }
}
