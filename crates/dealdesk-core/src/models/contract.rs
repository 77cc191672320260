//! Contract entity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealdeskError;

/// Lifecycle status of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    Draft,
    PendingCm,
    PendingTm,
    Approved,
    Rejected,
    Executed,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingCm => "pending_cm",
            Self::PendingTm => "pending_tm",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Executed)
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ContractStatus {
    type Error = DealdeskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "draft" => Ok(Self::Draft),
            "pending_cm" => Ok(Self::PendingCm),
            "pending_tm" => Ok(Self::PendingTm),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "executed" => Ok(Self::Executed),
            other => Err(DealdeskError::internal(format!(
                "Unknown contract status '{other}'"
            ))),
        }
    }
}

/// Editable contract settings. Locked before submission to CM; locking
/// is one-way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractSettings {
    pub contract_date: Option<NaiveDate>,
    pub power_of_attorney: Option<String>,
}

/// A contract drafted from an approved reservation form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub reservation_form_id: Uuid,
    pub status: ContractStatus,
    pub contract_settings_locked: bool,
    pub settings: ContractSettings,
    pub details: serde_json::Value,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}
