//! Payment plan entity and its approval states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealdeskError;
use crate::models::role::Role;

/// Approval status of a payment plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    PendingSm,
    PendingFm,
    PendingTm,
    Approved,
    Rejected,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingSm => "pending_sm",
            Self::PendingFm => "pending_fm",
            Self::PendingTm => "pending_tm",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Initial status for a plan created by the given role: consultants
    /// enter the SM queue, finance-side roles go straight to FM.
    pub fn initial_for(creator: Role) -> PlanStatus {
        if creator.is_financial() {
            Self::PendingFm
        } else {
            Self::PendingSm
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PlanStatus {
    type Error = DealdeskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending_sm" => Ok(Self::PendingSm),
            "pending_fm" => Ok(Self::PendingFm),
            "pending_tm" => Ok(Self::PendingTm),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DealdeskError::internal(format!(
                "Unknown plan status '{other}'"
            ))),
        }
    }
}

/// A proposed payment schedule for a deal. At most one plan per deal
/// carries `accepted = true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub details: serde_json::Value,
    pub created_by: Uuid,
    pub status: PlanStatus,
    pub accepted: bool,
    /// Monotonically increasing per deal, starting at 1
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_routing() {
        assert_eq!(
            PlanStatus::initial_for(Role::PropertyConsultant),
            PlanStatus::PendingSm
        );
        assert_eq!(
            PlanStatus::initial_for(Role::FinancialManager),
            PlanStatus::PendingFm
        );
        assert_eq!(
            PlanStatus::initial_for(Role::FinancialAdmin),
            PlanStatus::PendingFm
        );
        assert_eq!(PlanStatus::initial_for(Role::Admin), PlanStatus::PendingFm);
        assert_eq!(
            PlanStatus::initial_for(Role::SalesManager),
            PlanStatus::PendingSm
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(PlanStatus::Approved.is_terminal());
        assert!(PlanStatus::Rejected.is_terminal());
        assert!(!PlanStatus::PendingTm.is_terminal());
    }
}
