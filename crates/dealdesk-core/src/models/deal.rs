//! Deal entity: the root of the sales-deal graph.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealdeskError;

/// Lifecycle status of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    #[default]
    Draft,
    PendingApproval,
    Approved,
    Rejected,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for DealStatus {
    type Error = DealdeskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "draft" => Ok(Self::Draft),
            "pending_approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DealdeskError::internal(format!(
                "Unknown deal status '{other}'"
            ))),
        }
    }
}

/// A sales deal. `details` carries the frozen calculator snapshot as an
/// opaque blob; deserialise through `Snapshot` at every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub title: String,
    pub amount: Decimal,
    pub status: DealStatus,
    /// Set when the evaluator rejected the schedule and an authority
    /// override is required before approval
    pub needs_override: bool,
    pub override_approved_at: Option<DateTime<Utc>>,
    pub fm_review_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub details: serde_json::Value,
}

impl Deal {
    /// A deal may be approved when the evaluator accepted the schedule
    /// or an override was granted.
    pub fn approvable(&self, evaluator_accepted: bool) -> bool {
        evaluator_accepted || (self.needs_override && self.override_approved_at.is_some())
    }
}
