//! Append-only history records for entity state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealdeskError;

/// Entity kinds tracked by history tables and notification references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Deal,
    PaymentPlan,
    Unit,
    Block,
    ReservationForm,
    Contract,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::PaymentPlan => "payment_plan",
            Self::Unit => "unit",
            Self::Block => "block",
            Self::ReservationForm => "reservation_form",
            Self::Contract => "contract",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of state change recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Submit,
    ApproveSm,
    ApproveFm,
    ApproveTm,
    /// TM approved, skipping the SM/FM override stages
    ApproveTmBypass,
    ApproveCm,
    Reject,
    MarkAccepted,
    Escalate,
    Extend,
    Cancel,
    Expire,
    Execute,
    RequestAmendment,
    ApproveAmendment,
    RejectAmendment,
    OverrideSm,
    OverrideFm,
    OverrideTm,
    OverrideReject,
    ApproveOverride,
    UpdateSettings,
    LockSettings,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Submit => "submit",
            Self::ApproveSm => "approve_sm",
            Self::ApproveFm => "approve_fm",
            Self::ApproveTm => "approve_tm",
            Self::ApproveTmBypass => "approve_tm_bypass",
            Self::ApproveCm => "approve_cm",
            Self::Reject => "reject",
            Self::MarkAccepted => "mark_accepted",
            Self::Escalate => "escalate",
            Self::Extend => "extend",
            Self::Cancel => "cancel",
            Self::Expire => "expire",
            Self::Execute => "execute",
            Self::RequestAmendment => "request_amendment",
            Self::ApproveAmendment => "approve_amendment",
            Self::RejectAmendment => "reject_amendment",
            Self::OverrideSm => "override_sm",
            Self::OverrideFm => "override_fm",
            Self::OverrideTm => "override_tm",
            Self::OverrideReject => "override_reject",
            Self::ApproveOverride => "approve_override",
            Self::UpdateSettings => "update_settings",
            Self::LockSettings => "lock_settings",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ChangeType {
    type Error = DealdeskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        serde_json::from_value(serde_json::Value::String(s.clone()))
            .map_err(|_| DealdeskError::internal(format!("Unknown change type '{s}'")))
    }
}

/// One append-only history row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub entity_id: Uuid,
    pub change_type: ChangeType,
    pub changed_by: Uuid,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(entity_id: Uuid, change_type: ChangeType, changed_by: Uuid) -> Self {
        Self {
            entity_id,
            change_type,
            changed_by,
            old_values: None,
            new_values: None,
            at: Utc::now(),
        }
    }

    pub fn with_old(mut self, old: serde_json::Value) -> Self {
        self.old_values = Some(old);
        self
    }

    pub fn with_new(mut self, new: serde_json::Value) -> Self {
        self.new_values = Some(new);
        self
    }
}
