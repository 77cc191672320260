//! Notification events emitted on state transitions.
//!
//! The engine stages events during a transaction and hands them to a sink
//! after commit; delivery transport is external.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::history::EntityKind;
use crate::models::role::Role;

/// Who should receive an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RecipientCriteria {
    /// Every active user holding one of these roles
    Roles(Vec<Role>),
    /// Explicit user ids
    Users(Vec<Uuid>),
}

impl RecipientCriteria {
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::Roles(roles.into_iter().collect())
    }

    pub fn user(id: Uuid) -> Self {
        Self::Users(vec![id])
    }
}

/// Event type taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PlanSubmitted,
    PlanApproved,
    PlanRejected,
    PlanEscalated,
    PlanAccepted,
    DealSubmitted,
    DealApproved,
    DealRejected,
    BlockRequested,
    BlockApproved,
    BlockRejected,
    BlockExtended,
    BlockCancelled,
    BlockExpired,
    BlockOverridePending,
    BlockOverrideApproved,
    BlockOverrideRejected,
    BlockHoldReminder,
    ReservationCreated,
    ReservationApproved,
    ReservationRejected,
    ReservationCancelled,
    AmendmentRequested,
    AmendmentApproved,
    AmendmentRejected,
    ContractDrafted,
    ContractSubmitted,
    ContractApprovedCm,
    ContractApprovedTm,
    ContractRejected,
    ContractExecuted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanSubmitted => "plan_submitted",
            Self::PlanApproved => "plan_approved",
            Self::PlanRejected => "plan_rejected",
            Self::PlanEscalated => "plan_escalated",
            Self::PlanAccepted => "plan_accepted",
            Self::DealSubmitted => "deal_submitted",
            Self::DealApproved => "deal_approved",
            Self::DealRejected => "deal_rejected",
            Self::BlockRequested => "block_requested",
            Self::BlockApproved => "block_approved",
            Self::BlockRejected => "block_rejected",
            Self::BlockExtended => "block_extended",
            Self::BlockCancelled => "block_cancelled",
            Self::BlockExpired => "block_expired",
            Self::BlockOverridePending => "block_override_pending",
            Self::BlockOverrideApproved => "block_override_approved",
            Self::BlockOverrideRejected => "block_override_rejected",
            Self::BlockHoldReminder => "block_hold_reminder",
            Self::ReservationCreated => "reservation_created",
            Self::ReservationApproved => "reservation_approved",
            Self::ReservationRejected => "reservation_rejected",
            Self::ReservationCancelled => "reservation_cancelled",
            Self::AmendmentRequested => "amendment_requested",
            Self::AmendmentApproved => "amendment_approved",
            Self::AmendmentRejected => "amendment_rejected",
            Self::ContractDrafted => "contract_drafted",
            Self::ContractSubmitted => "contract_submitted",
            Self::ContractApprovedCm => "contract_approved_cm",
            Self::ContractApprovedTm => "contract_approved_tm",
            Self::ContractRejected => "contract_rejected",
            Self::ContractExecuted => "contract_executed",
        }
    }
}

/// A single notification event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub recipients: RecipientCriteria,
    pub kind: NotificationKind,
    pub ref_entity: EntityKind,
    pub ref_id: Uuid,
    pub message: String,
}

impl NotificationEvent {
    pub fn new(
        recipients: RecipientCriteria,
        kind: NotificationKind,
        ref_entity: EntityKind,
        ref_id: Uuid,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipients,
            kind,
            ref_entity,
            ref_id,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_form() {
        assert_eq!(NotificationKind::BlockExpired.as_str(), "block_expired");
        assert_eq!(
            serde_json::to_value(NotificationKind::BlockExpired).unwrap(),
            serde_json::Value::String("block_expired".into())
        );
    }

    #[test]
    fn test_recipient_roles() {
        let r = RecipientCriteria::roles([Role::FinancialManager]);
        assert_eq!(r, RecipientCriteria::Roles(vec![Role::FinancialManager]));
    }
}
