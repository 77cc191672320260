//! Policy configuration: discount limits and acceptance thresholds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::role::Role;

/// Soft discount limit applied when no active policy row exists.
pub const DEFAULT_POLICY_LIMIT_PERCENT: Decimal = dec!(5);

/// Cumulative-payment acceptance thresholds. Minimums are mandatory,
/// ceilings optional (None = no upper bound).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceThresholds {
    pub pv_tolerance_percent: Decimal,
    pub year_1_min_percent: Decimal,
    pub year_1_max_percent: Option<Decimal>,
    pub year_2_min_percent: Decimal,
    pub year_2_max_percent: Option<Decimal>,
    pub year_3_min_percent: Decimal,
    pub year_3_max_percent: Option<Decimal>,
    pub handover_min_percent: Decimal,
    pub handover_max_percent: Option<Decimal>,
}

impl Default for AcceptanceThresholds {
    fn default() -> Self {
        Self {
            pv_tolerance_percent: dec!(100),
            year_1_min_percent: dec!(35),
            year_1_max_percent: None,
            year_2_min_percent: dec!(50),
            year_2_max_percent: None,
            year_3_min_percent: dec!(65),
            year_3_max_percent: None,
            handover_min_percent: dec!(65),
            handover_max_percent: None,
        }
    }
}

/// A policy row. The active global policy is the most recently created
/// row with `scope_type = "global"` and `active = true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub id: Uuid,
    pub scope_type: String,
    pub policy_limit_percent: Decimal,
    pub thresholds: AcceptanceThresholds,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl PolicyConfig {
    /// Default policy used when no active row exists or the stored row
    /// fails validation.
    pub fn fallback() -> Self {
        Self {
            id: Uuid::nil(),
            scope_type: "global".to_string(),
            policy_limit_percent: DEFAULT_POLICY_LIMIT_PERCENT,
            thresholds: AcceptanceThresholds::default(),
            active: true,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// A stored policy is usable when its numbers are sane.
    pub fn is_valid(&self) -> bool {
        self.policy_limit_percent >= Decimal::ZERO
            && self.policy_limit_percent <= dec!(100)
            && self.thresholds.pv_tolerance_percent > Decimal::ZERO
    }
}

/// Hard per-role discount cap enforced at plan generation time.
/// Returns None for roles that may not generate discounted plans at all.
pub fn discount_authority(role: Role) -> Option<Decimal> {
    match role {
        Role::PropertyConsultant => Some(dec!(2)),
        Role::FinancialManager | Role::FinancialAdmin | Role::Admin => Some(dec!(5)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = AcceptanceThresholds::default();
        assert_eq!(t.year_1_min_percent, dec!(35));
        assert_eq!(t.year_2_min_percent, dec!(50));
        assert_eq!(t.year_3_min_percent, dec!(65));
        assert_eq!(t.handover_min_percent, dec!(65));
        assert_eq!(t.pv_tolerance_percent, dec!(100));
        assert!(t.year_1_max_percent.is_none());
    }

    #[test]
    fn test_discount_authority() {
        assert_eq!(discount_authority(Role::PropertyConsultant), Some(dec!(2)));
        assert_eq!(discount_authority(Role::FinancialManager), Some(dec!(5)));
        assert_eq!(discount_authority(Role::SalesManager), None);
    }

    #[test]
    fn test_fallback_is_valid() {
        assert!(PolicyConfig::fallback().is_valid());
    }
}
