//! Versioned calculator snapshot.
//!
//! Deals, plans, reservations and contracts carry a frozen copy of the
//! calculator output. It is persisted as an opaque JSONB blob but must be
//! deserialised into a concrete version at every read so schema drift is
//! caught at the boundary instead of deep inside a handler.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DealdeskError, DealdeskResult};
use crate::models::schedule::{Evaluation, PlanTotals, ScheduleEntry};

/// A buyer captured at calculation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyerInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Unit facts frozen into the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub unit_id: Uuid,
    pub code: String,
    pub total_price: Decimal,
}

/// The generated plan as frozen at proposal time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub schedule: Vec<ScheduleEntry>,
    pub totals: PlanTotals,
    pub sales_discount_percent: Decimal,
}

/// Versioned snapshot envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version", rename_all = "snake_case")]
pub enum Snapshot {
    V1(SnapshotV1),
}

/// Version 1 payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotV1 {
    #[serde(default)]
    pub buyers: Vec<BuyerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_plan: Option<GeneratedPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

impl Snapshot {
    pub fn v1(payload: SnapshotV1) -> Self {
        Self::V1(payload)
    }

    /// Decode from the stored blob. Unknown versions or malformed payloads
    /// surface as internal errors naming the problem.
    pub fn from_blob(blob: &serde_json::Value) -> DealdeskResult<Self> {
        serde_json::from_value(blob.clone())
            .map_err(|e| DealdeskError::internal(format!("Unreadable snapshot: {e}")))
    }

    /// Encode to the stored blob form.
    pub fn to_blob(&self) -> DealdeskResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn payload(&self) -> &SnapshotV1 {
        match self {
            Self::V1(p) => p,
        }
    }

    /// Whether the frozen evaluation accepted the schedule.
    pub fn evaluator_accepted(&self) -> bool {
        self.payload()
            .evaluation
            .as_ref()
            .map(Evaluation::accepted)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blob_round_trip() {
        let snap = Snapshot::v1(SnapshotV1 {
            buyers: vec![BuyerInfo {
                name: "A. Buyer".into(),
                national_id: None,
                phone: None,
                address: None,
            }],
            unit: None,
            generated_plan: None,
            evaluation: None,
        });
        let blob = snap.to_blob().unwrap();
        assert_eq!(blob["version"], "v1");
        assert_eq!(Snapshot::from_blob(&blob).unwrap(), snap);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let blob = json!({"version": "v9", "buyers": []});
        assert!(Snapshot::from_blob(&blob).is_err());
    }

    #[test]
    fn test_missing_evaluation_is_not_accept() {
        let snap = Snapshot::v1(SnapshotV1 {
            buyers: vec![],
            unit: None,
            generated_plan: None,
            evaluation: None,
        });
        assert!(!snap.evaluator_accepted());
    }
}
