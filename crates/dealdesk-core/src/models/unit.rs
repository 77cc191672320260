//! Unit inventory entity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealdeskError;

/// Inventory status of a unit. `Available` is the only status in which
/// `available` is true; the block -> reserve -> sell chain owns every
/// transition away from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    InventoryDraft,
    Available,
    Blocked,
    Reserved,
    Sold,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InventoryDraft => "INVENTORY_DRAFT",
            Self::Available => "AVAILABLE",
            Self::Blocked => "BLOCKED",
            Self::Reserved => "RESERVED",
            Self::Sold => "SOLD",
        }
    }

    /// The availability flag implied by this status.
    pub fn implies_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for UnitStatus {
    type Error = DealdeskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "INVENTORY_DRAFT" => Ok(Self::InventoryDraft),
            "AVAILABLE" => Ok(Self::Available),
            "BLOCKED" => Ok(Self::Blocked),
            "RESERVED" => Ok(Self::Reserved),
            "SOLD" => Ok(Self::Sold),
            other => Err(DealdeskError::internal(format!(
                "Unknown unit status '{other}'"
            ))),
        }
    }
}

/// A sellable unit with its pricing breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    /// Unique inventory code
    pub code: String,
    pub unit_status: UnitStatus,
    pub available: bool,
    pub model_id: Option<Uuid>,
    pub base_price: Decimal,
    pub garden_price: Decimal,
    pub roof_price: Decimal,
    pub storage_price: Decimal,
    pub garage_price: Decimal,
    pub maintenance_price: Decimal,
}

impl Unit {
    pub fn total_price(&self) -> Decimal {
        self.base_price + self.garden_price + self.roof_price + self.storage_price
            + self.garage_price
    }

    /// Check the `unit_status = AVAILABLE <=> available` invariant.
    pub fn availability_consistent(&self) -> bool {
        self.available == self.unit_status.implies_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn unit(status: UnitStatus, available: bool) -> Unit {
        Unit {
            id: Uuid::new_v4(),
            code: "A-101".into(),
            unit_status: status,
            available,
            model_id: None,
            base_price: dec!(1_000_000),
            garden_price: dec!(0),
            roof_price: dec!(0),
            storage_price: dec!(50_000),
            garage_price: dec!(0),
            maintenance_price: dec!(30_000),
        }
    }

    #[test]
    fn test_availability_invariant() {
        assert!(unit(UnitStatus::Available, true).availability_consistent());
        assert!(unit(UnitStatus::Blocked, false).availability_consistent());
        assert!(!unit(UnitStatus::Blocked, true).availability_consistent());
        assert!(!unit(UnitStatus::Available, false).availability_consistent());
    }

    #[test]
    fn test_total_price_excludes_maintenance() {
        let u = unit(UnitStatus::Available, true);
        assert_eq!(u.total_price(), dec!(1_050_000));
    }
}
