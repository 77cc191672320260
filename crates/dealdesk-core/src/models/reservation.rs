//! Reservation form entity and the amendment sub-protocol.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealdeskError;

/// Lifecycle status of a reservation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    PendingApproval,
    Approved,
    Rejected,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// A pending or approved form blocks further forms on the same plan.
    pub fn occupies_plan(&self) -> bool {
        matches!(self, Self::PendingApproval | Self::Approved)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ReservationStatus {
    type Error = DealdeskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending_approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DealdeskError::internal(format!(
                "Unknown reservation status '{other}'"
            ))),
        }
    }
}

/// A pending request to amend an approved reservation form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendmentRequest {
    pub new_reservation_date: NaiveDate,
    pub new_preliminary_payment: Decimal,
    pub reason: String,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
}

/// Archived amendment attempt, whether applied or rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendmentRecord {
    pub request: AmendmentRequest,
    /// Values in force before the request was decided
    pub previous_reservation_date: NaiveDate,
    pub previous_preliminary_payment: Decimal,
    pub applied: bool,
    pub decided_by: Uuid,
    pub decided_at: DateTime<Utc>,
}

/// Mutable detail payload of a reservation form, persisted as JSONB.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amendment_request: Option<AmendmentRequest>,
    #[serde(default)]
    pub amendment_history: Vec<AmendmentRecord>,
}

/// A reservation form binding an approved payment plan to a blocked unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationForm {
    pub id: Uuid,
    pub payment_plan_id: Uuid,
    pub unit_id: Uuid,
    pub reservation_date: NaiveDate,
    pub preliminary_payment: Decimal,
    pub status: ReservationStatus,
    pub details: ReservationDetails,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ReservationForm {
    pub fn has_pending_amendment(&self) -> bool {
        self.details.amendment_request.is_some()
    }
}
