//! Payment schedule and evaluation output types.
//!
//! These are produced by the plan evaluator and persisted inside entity
//! snapshots, so they live in core rather than in the evaluator crate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of a schedule entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    DownPayment,
    Installment,
    Handover,
    MaintenanceDeposit,
}

/// Single dated payment in a generated schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Display label, e.g. "Down Payment", "Year 2 Installment 3"
    pub label: String,
    /// Months after contract start; month 0 = signing
    pub month_offset: u32,
    /// Amount rounded to 2 decimals at emission
    pub amount: Decimal,
    pub kind: EntryKind,
}

impl ScheduleEntry {
    pub fn new(label: impl Into<String>, month_offset: u32, amount: Decimal, kind: EntryKind) -> Self {
        Self {
            label: label.into(),
            month_offset,
            amount,
            kind,
        }
    }

    /// Maintenance deposits carry nominal value but are excluded from PV.
    pub fn counts_toward_pv(&self) -> bool {
        self.kind != EntryKind::MaintenanceDeposit
    }
}

/// Nominal totals of a generated schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTotals {
    /// Sum of every entry including maintenance deposit
    pub grand_total: Decimal,
    /// Nominal total used by the acceptance conditions:
    /// everything except the maintenance deposit
    pub total_nominal: Decimal,
    pub down_payment_total: Decimal,
    pub installment_count: u32,
}

/// ACCEPT/REJECT verdict on a proposed schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Reject,
}

/// Outcome of a single acceptance condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    /// Condition identifier, e.g. "cumulative_y1"
    pub name: String,
    /// Whether the condition holds; skipped conditions pass vacuously
    pub passed: bool,
    /// Condition was not applicable (e.g. handover year unset)
    pub skipped: bool,
    /// Achieved cumulative percentage of the nominal total
    pub actual_percent: Decimal,
    pub min_percent: Option<Decimal>,
    pub max_percent: Option<Decimal>,
}

/// Present-value comparison against the standard plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvResult {
    pub proposed_pv: f64,
    pub standard_pv: f64,
    pub tolerance_percent: Decimal,
    pub passed: bool,
    /// True when the stored FM value was used because recomputation
    /// was not possible
    pub used_stored_fm_pv: bool,
}

/// Full acceptance evaluation of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub decision: Decision,
    pub pv: PvResult,
    pub conditions: Vec<ConditionResult>,
}

impl Evaluation {
    pub fn accepted(&self) -> bool {
        self.decision == Decision::Accept
    }
}
