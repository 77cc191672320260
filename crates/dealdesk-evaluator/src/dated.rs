//! Calendar decoration of a generated schedule: due dates and written
//! amounts for document rendering.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use dealdesk_core::models::ScheduleEntry;
use dealdesk_core::numwords::amount_in_words;

/// A schedule entry with its resolved due date and written amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedEntry {
    #[serde(flatten)]
    pub entry: ScheduleEntry,
    pub due_date: NaiveDate,
    pub amount_in_words: String,
}

/// Resolve month offsets against a contract start date. Offsets landing
/// past the end of a month clamp to that month's last day (chrono's
/// month arithmetic handles this).
pub fn with_due_dates(
    schedule: &[ScheduleEntry],
    start_date: NaiveDate,
    currency: &str,
) -> Vec<DatedEntry> {
    schedule
        .iter()
        .map(|entry| DatedEntry {
            entry: entry.clone(),
            due_date: start_date + Months::new(entry.month_offset),
            amount_in_words: amount_in_words(entry.amount, currency),
        })
        .collect()
}

/// Which syntax a document date arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateForm {
    Strict,
    IsoFallback,
}

/// Parse a document date, `dd/MM/YYYY` first, ISO `YYYY-MM-dd` as a
/// fallback. Reports which form matched so the caller can log lenient
/// usage; the two legacy parsers disagreed here and the strict one wins.
pub fn parse_document_date_tagged(s: &str) -> Option<(NaiveDate, DateForm)> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some((date, DateForm::Strict));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| (d, DateForm::IsoFallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealdesk_core::models::EntryKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_due_dates_step_by_month_offset() {
        let schedule = vec![
            ScheduleEntry::new("DP", 0, dec!(1000), EntryKind::DownPayment),
            ScheduleEntry::new("I1", 3, dec!(500), EntryKind::Installment),
        ];
        let start = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let dated = with_due_dates(&schedule, start, "pounds");
        assert_eq!(dated[0].due_date, start);
        // Jan 31 + 3 months clamps to Apr 30
        assert_eq!(
            dated[1].due_date,
            NaiveDate::from_ymd_opt(2026, 4, 30).unwrap()
        );
        assert_eq!(dated[0].amount_in_words, "one thousand pounds");
    }

    #[test]
    fn test_strict_date_form_preferred() {
        let (date, form) = parse_document_date_tagged("05/03/2026").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        assert_eq!(form, DateForm::Strict);

        let (date, form) = parse_document_date_tagged("2026-03-05").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        assert_eq!(form, DateForm::IsoFallback);

        assert!(parse_document_date_tagged("03-05-2026").is_none());
    }
}
