//! Unit block entity: a time-boxed exclusive hold on a unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealdeskError;

/// Hard limits on hold durations.
pub const MIN_BLOCK_DAYS: i32 = 1;
pub const MAX_BLOCK_DAYS: i32 = 28;
/// Days added per approved extension.
pub const EXTENSION_STEP_DAYS: i32 = 7;
/// Maximum number of extensions per block.
pub const MAX_EXTENSIONS: i32 = 3;

/// Lifecycle status of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl BlockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for BlockStatus {
    type Error = DealdeskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            other => Err(DealdeskError::internal(format!(
                "Unknown block status '{other}'"
            ))),
        }
    }
}

/// Stage of the authority override chain. The chain walks
/// SM -> FM -> TM; TM may jump straight to approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStatus {
    #[default]
    None,
    PendingSm,
    PendingFm,
    PendingTm,
    Approved,
    Rejected,
}

impl OverrideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PendingSm => "pending_sm",
            Self::PendingFm => "pending_fm",
            Self::PendingTm => "pending_tm",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for OverrideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for OverrideStatus {
    type Error = DealdeskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "none" => Ok(Self::None),
            "pending_sm" => Ok(Self::PendingSm),
            "pending_fm" => Ok(Self::PendingFm),
            "pending_tm" => Ok(Self::PendingTm),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DealdeskError::internal(format!(
                "Unknown override status '{other}'"
            ))),
        }
    }
}

/// Financial verdict recorded on the block request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinancialDecision {
    Accept,
    Reject,
}

impl FinancialDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Reject => "REJECT",
        }
    }
}

impl TryFrom<String> for FinancialDecision {
    type Error = DealdeskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "ACCEPT" => Ok(Self::Accept),
            "REJECT" => Ok(Self::Reject),
            other => Err(DealdeskError::internal(format!(
                "Unknown financial decision '{other}'"
            ))),
        }
    }
}

/// An exclusive hold on a unit. At most one block per unit may be
/// `approved` with `blocked_until` in the future.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub requested_by: Uuid,
    /// Initial duration in days, within [1, 28]
    pub duration_days: i32,
    pub status: BlockStatus,
    pub override_status: OverrideStatus,
    pub blocked_until: DateTime<Utc>,
    pub extension_count: i32,
    pub financial_decision: Option<FinancialDecision>,
    pub reason: Option<String>,
    /// Next hold-reminder emission time while the block is active
    pub next_notify_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Block {
    /// An active hold keeps the unit out of inventory.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == BlockStatus::Approved && self.blocked_until > now
    }

    /// Validate an extension request: count below the cap and the total
    /// duration (initial + 7 per prior extension + the new days) within
    /// the 28-day ceiling.
    pub fn extension_allowed(&self, additional_days: i32) -> bool {
        additional_days > 0
            && self.extension_count < MAX_EXTENSIONS
            && self.duration_days + self.extension_count * EXTENSION_STEP_DAYS + additional_days
                <= MAX_BLOCK_DAYS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn block(duration: i32, extensions: i32) -> Block {
        let now = Utc::now();
        Block {
            id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            requested_by: Uuid::new_v4(),
            duration_days: duration,
            status: BlockStatus::Approved,
            override_status: OverrideStatus::None,
            blocked_until: now + Duration::days(duration as i64),
            extension_count: extensions,
            financial_decision: Some(FinancialDecision::Accept),
            reason: None,
            next_notify_at: None,
            created_at: now,
        }
    }

    #[test]
    fn test_active_window() {
        let b = block(7, 0);
        assert!(b.is_active(Utc::now()));
        assert!(!b.is_active(Utc::now() + Duration::days(8)));
    }

    #[test]
    fn test_extension_limits() {
        assert!(block(7, 0).extension_allowed(7));
        // 3 extensions already consumed
        assert!(!block(7, 3).extension_allowed(1));
        // 14 + 2*7 + 1 > 28
        assert!(!block(14, 2).extension_allowed(1));
        // 7 + 2*7 + 7 = 28, right at the ceiling
        assert!(block(7, 2).extension_allowed(7));
        assert!(!block(7, 0).extension_allowed(0));
    }
}
