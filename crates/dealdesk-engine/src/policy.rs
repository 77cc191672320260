//! Policy and authority resolution.

use rust_decimal::Decimal;
use tracing::warn;

use dealdesk_core::models::{discount_authority, PolicyConfig, Role};
use dealdesk_core::{DealdeskError, DealdeskResult};
use dealdesk_store::{repo, Conn};

/// Resolve the active policy: the most recent active global row, or the
/// built-in defaults when none exists or the stored row is unusable.
pub async fn active_policy(conn: &mut Conn) -> DealdeskResult<PolicyConfig> {
    match repo::policy::active_global(conn).await? {
        Some(policy) if policy.is_valid() => Ok(policy),
        Some(policy) => {
            warn!(policy_id = %policy.id, "stored policy failed validation, using defaults");
            Ok(PolicyConfig::fallback())
        }
        None => Ok(PolicyConfig::fallback()),
    }
}

/// Hard per-role cap applied at plan generation time. Over-cap requests
/// are rejected outright; the soft policy limit later decides whether FM
/// approval escalates to TM.
pub fn enforce_discount_authority(role: Role, discount_percent: Decimal) -> DealdeskResult<()> {
    if discount_percent <= Decimal::ZERO {
        return Ok(());
    }
    let cap = discount_authority(role).ok_or_else(|| {
        DealdeskError::forbidden(format!("Role {role} may not generate discounted plans"))
    })?;
    if discount_percent > cap {
        return Err(DealdeskError::forbidden(format!(
            "Discount {discount_percent}% exceeds the {cap}% authority of role {role}"
        )));
    }
    Ok(())
}

/// Whether a discount forces FM escalation to TM.
pub fn requires_tm_escalation(policy: &PolicyConfig, discount_percent: Decimal) -> bool {
    discount_percent > policy.policy_limit_percent
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_consultant_cap() {
        assert!(enforce_discount_authority(Role::PropertyConsultant, dec!(2)).is_ok());
        assert!(enforce_discount_authority(Role::PropertyConsultant, dec!(2.5)).is_err());
    }

    #[test]
    fn test_fm_cap() {
        assert!(enforce_discount_authority(Role::FinancialManager, dec!(5)).is_ok());
        assert!(enforce_discount_authority(Role::FinancialManager, dec!(5.01)).is_err());
    }

    #[test]
    fn test_unprivileged_role_with_zero_discount() {
        // roles without authority may still generate undiscounted plans
        assert!(enforce_discount_authority(Role::SalesManager, Decimal::ZERO).is_ok());
        assert!(enforce_discount_authority(Role::SalesManager, dec!(1)).is_err());
    }

    #[test]
    fn test_escalation_threshold() {
        let policy = PolicyConfig::fallback();
        assert!(!requires_tm_escalation(&policy, dec!(5)));
        assert!(requires_tm_escalation(&policy, dec!(7)));
    }
}
