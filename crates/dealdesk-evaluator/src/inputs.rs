//! Evaluator input types and validation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use dealdesk_core::{DealdeskError, DealdeskResult, FieldError};

/// Bounds on plan duration in years.
pub const MIN_DURATION_YEARS: u32 = 1;
pub const MAX_DURATION_YEARS: u32 = 12;

/// Installment frequency. Parsing is case-insensitive and accepts the
/// legacy "biannually" spelling for `bi-annually`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Monthly,
    Quarterly,
    #[serde(alias = "biannually")]
    BiAnnually,
    Annually,
}

impl Frequency {
    /// Number of installments per year.
    pub fn per_year(&self) -> u32 {
        match self {
            Self::Monthly => 12,
            Self::Quarterly => 4,
            Self::BiAnnually => 2,
            Self::Annually => 1,
        }
    }

    /// Months between consecutive installments.
    pub fn stride_months(&self) -> u32 {
        12 / self.per_year()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::BiAnnually => "bi-annually",
            Self::Annually => "annually",
        }
    }

    /// Parse a frequency string, normalising case and the spelling
    /// without a hyphen.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "bi-annually" | "biannually" => Some(Self::BiAnnually),
            "annually" => Some(Self::Annually),
            _ => None,
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the down payment value is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DpType {
    /// `down_payment_value` is a percentage of the discounted price
    Percentage,
    /// `down_payment_value` is an absolute amount
    Amount,
}

/// Schedule generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// Distribute the post-DP remainder as level installments over the
    /// whole horizon
    Standard,
    /// Year-by-year nominal totals supplied by the caller
    CustomYearly,
    /// Equal-installment resolver: solve the level payment that closes
    /// the PV gap to the standard plan
    TargetPv,
}

/// One explicit first-year payment when the first year is split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstYearPayment {
    pub amount: Decimal,
    /// Month offset within the first year, 1..=12
    pub month: u32,
    /// `dp` entries count toward the down-payment total
    #[serde(rename = "type")]
    pub payment_type: FirstYearPaymentType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstYearPaymentType {
    Dp,
    Regular,
}

/// Nominal total for one subsequent year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsequentYear {
    pub total_nominal: Decimal,
    pub frequency: Frequency,
}

/// Maintenance deposit configuration. The deposit is excluded from PV
/// but included in grand totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceDeposit {
    #[serde(default)]
    pub amount: Decimal,
    /// Explicit due date, resolved against `start_date`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Explicit month offset, used when no date is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
}

/// The FM standard plan the proposal is measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StdPlan {
    pub total_price: Decimal,
    pub annual_rate_percent: Decimal,
    /// Stored FM present value; the recomputed value is authoritative
    /// and this is only a fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_pv: Option<f64>,
}

/// Proposed plan parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInputs {
    #[serde(default)]
    pub mode: Option<PlanMode>,
    #[serde(default)]
    pub sales_discount_percent: Decimal,
    pub dp_type: DpType,
    pub down_payment_value: Decimal,
    pub plan_duration_years: u32,
    pub installment_frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handover_year: Option<u32>,
    #[serde(default)]
    pub additional_handover_payment: Decimal,
    #[serde(default)]
    pub split_first_year_payments: bool,
    #[serde(default)]
    pub first_year_payments: Vec<FirstYearPayment>,
    #[serde(default)]
    pub subsequent_years: Vec<SubsequentYear>,
    #[serde(default)]
    pub maintenance_deposit: MaintenanceDeposit,
    /// Contract start, used only to resolve an explicit maintenance date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

impl PlanInputs {
    pub fn mode(&self) -> PlanMode {
        self.mode.unwrap_or(PlanMode::Standard)
    }

    /// Total price after the sales discount.
    pub fn effective_total(&self, total_price: Decimal) -> Decimal {
        (total_price * (dec!(100) - self.sales_discount_percent) / dec!(100)).round_dp(2)
    }
}

/// Validate the standard plan and proposal inputs, collecting every
/// field problem before failing.
pub fn validate(std_plan: &StdPlan, inputs: &PlanInputs) -> DealdeskResult<()> {
    let mut details = Vec::new();

    if std_plan.total_price <= Decimal::ZERO {
        details.push(FieldError::new(
            "stdPlan.totalPrice",
            "Total price must be positive",
        ));
    }
    if std_plan.annual_rate_percent < Decimal::ZERO {
        details.push(FieldError::new(
            "stdPlan.annualRatePercent",
            "Annual rate cannot be negative",
        ));
    }

    if !(MIN_DURATION_YEARS..=MAX_DURATION_YEARS).contains(&inputs.plan_duration_years) {
        details.push(FieldError::new(
            "inputs.planDurationYears",
            format!(
                "Plan duration must be between {MIN_DURATION_YEARS} and {MAX_DURATION_YEARS} years"
            ),
        ));
    }

    if inputs.sales_discount_percent < Decimal::ZERO || inputs.sales_discount_percent > dec!(100) {
        details.push(FieldError::new(
            "inputs.salesDiscountPercent",
            "Sales discount must be between 0 and 100 percent",
        ));
    }

    if inputs.down_payment_value < Decimal::ZERO {
        details.push(FieldError::new(
            "inputs.downPaymentValue",
            "Down payment cannot be negative",
        ));
    }
    if inputs.dp_type == DpType::Percentage && inputs.down_payment_value > dec!(100) {
        details.push(FieldError::new(
            "inputs.downPaymentValue",
            "Down payment percentage cannot exceed 100",
        ));
    }

    if inputs.additional_handover_payment < Decimal::ZERO {
        details.push(FieldError::new(
            "inputs.additionalHandoverPayment",
            "Handover payment cannot be negative",
        ));
    }

    if let Some(year) = inputs.handover_year {
        if !(1..=MAX_DURATION_YEARS).contains(&year) {
            details.push(FieldError::new(
                "inputs.handoverYear",
                format!("Handover year must be between 1 and {MAX_DURATION_YEARS}"),
            ));
        }
    }

    if inputs.split_first_year_payments && inputs.first_year_payments.is_empty() {
        details.push(FieldError::new(
            "inputs.firstYearPayments",
            "Split first year requires at least one payment",
        ));
    }
    for (i, p) in inputs.first_year_payments.iter().enumerate() {
        if p.amount < Decimal::ZERO {
            details.push(FieldError::new(
                format!("inputs.firstYearPayments[{i}].amount"),
                "Amount cannot be negative",
            ));
        }
        if !(1..=12).contains(&p.month) {
            details.push(FieldError::new(
                format!("inputs.firstYearPayments[{i}].month"),
                "Month must be between 1 and 12",
            ));
        }
    }

    for (i, y) in inputs.subsequent_years.iter().enumerate() {
        if y.total_nominal < Decimal::ZERO {
            details.push(FieldError::new(
                format!("inputs.subsequentYears[{i}].totalNominal"),
                "Year total cannot be negative",
            ));
        }
    }

    if inputs.maintenance_deposit.amount < Decimal::ZERO {
        details.push(FieldError::new(
            "inputs.maintenanceDeposit.amount",
            "Maintenance deposit cannot be negative",
        ));
    }
    if let Some(month) = inputs.maintenance_deposit.month {
        if month == 0 {
            details.push(FieldError::new(
                "inputs.maintenanceDeposit.month",
                "Month must be at least 1",
            ));
        }
    }

    if inputs.mode() == PlanMode::CustomYearly && inputs.subsequent_years.is_empty() {
        details.push(FieldError::new(
            "inputs.subsequentYears",
            "Custom yearly mode requires at least one year",
        ));
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(DealdeskError::invalid_input(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> PlanInputs {
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

    fn std_plan() -> StdPlan {
        StdPlan {
            total_price: dec!(1_000_000),
            annual_rate_percent: dec!(12),
            standard_pv: None,
        }
    }

    #[test]
    fn test_frequency_normalisation() {
        assert_eq!(Frequency::parse("QUARTERLY"), Some(Frequency::Quarterly));
        assert_eq!(Frequency::parse("biannually"), Some(Frequency::BiAnnually));
        assert_eq!(Frequency::parse("Bi-Annually"), Some(Frequency::BiAnnually));
        assert_eq!(Frequency::parse("weekly"), None);
    }

    #[test]
    fn test_frequency_serde_alias() {
        let f: Frequency = serde_json::from_str("\"biannually\"").unwrap();
        assert_eq!(f, Frequency::BiAnnually);
        assert_eq!(serde_json::to_string(&f).unwrap(), "\"bi-annually\"");
    }

    #[test]
    fn test_valid_inputs_pass() {
        assert!(validate(&std_plan(), &base_inputs()).is_ok());
    }

    #[test]
    fn test_duration_bounds() {
        let mut inputs = base_inputs();
        inputs.plan_duration_years = 13;
        let err = validate(&std_plan(), &inputs).unwrap_err();
        let details = err.field_details().unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "inputs.planDurationYears");
    }

    #[test]
    fn test_collects_all_field_errors() {
        let mut inputs = base_inputs();
        inputs.plan_duration_years = 0;
        inputs.down_payment_value = dec!(-5);
        inputs.additional_handover_payment = dec!(-1);
        let err = validate(&std_plan(), &inputs).unwrap_err();
        assert_eq!(err.field_details().unwrap().len(), 3);
    }

    #[test]
    fn test_split_requires_payments() {
        let mut inputs = base_inputs();
        inputs.split_first_year_payments = true;
        assert!(validate(&std_plan(), &inputs).is_err());
    }

    #[test]
    fn test_effective_total_applies_discount() {
        let mut inputs = base_inputs();
        inputs.sales_discount_percent = dec!(5);
        assert_eq!(inputs.effective_total(dec!(1_000_000)), dec!(950_000));
    }
}
