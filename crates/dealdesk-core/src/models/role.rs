//! Roles and authenticated principals.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealdeskError;

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    PropertyConsultant,
    SalesManager,
    FinancialManager,
    FinancialAdmin,
    TopManagement,
    ContractAdmin,
    ContractManager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PropertyConsultant => "property_consultant",
            Self::SalesManager => "sales_manager",
            Self::FinancialManager => "financial_manager",
            Self::FinancialAdmin => "financial_admin",
            Self::TopManagement => "top_management",
            Self::ContractAdmin => "contract_admin",
            Self::ContractManager => "contract_manager",
            Self::Admin => "admin",
        }
    }

    /// Roles allowed to create payment plans on behalf of the finance side.
    pub fn is_financial(&self) -> bool {
        matches!(
            self,
            Self::FinancialManager | Self::FinancialAdmin | Self::Admin
        )
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = DealdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "property_consultant" => Ok(Self::PropertyConsultant),
            "sales_manager" => Ok(Self::SalesManager),
            "financial_manager" => Ok(Self::FinancialManager),
            "financial_admin" => Ok(Self::FinancialAdmin),
            "top_management" => Ok(Self::TopManagement),
            "contract_admin" => Ok(Self::ContractAdmin),
            "contract_manager" => Ok(Self::ContractManager),
            "admin" => Ok(Self::Admin),
            other => Err(DealdeskError::invalid_field(
                "role",
                format!("Unknown role '{other}'"),
            )),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = DealdeskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Authenticated principal attached to every engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            Role::PropertyConsultant,
            Role::SalesManager,
            Role::FinancialManager,
            Role::FinancialAdmin,
            Role::TopManagement,
            Role::ContractAdmin,
            Role::ContractManager,
            Role::Admin,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!("intern".parse::<Role>().is_err());
    }
}
