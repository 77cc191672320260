//! Generic role-gated transition machine.
//!
//! Each entity declares its lifecycle as a static table of
//! `(from, action, allowed roles) -> to` rules; services resolve the rule
//! inside a serializable transaction after re-reading the row under lock.
//! The sibling route files this replaces each re-implemented these checks
//! inline.

use dealdesk_core::models::{ChangeType, Role};
use dealdesk_core::{DealdeskError, DealdeskResult};

/// One permitted transition.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule<S: 'static> {
    pub from: S,
    pub action: ChangeType,
    pub roles: &'static [Role],
    pub to: S,
}

/// A lifecycle table for one entity kind.
#[derive(Debug)]
pub struct TransitionTable<S: 'static> {
    /// Human label used in error messages, e.g. "Reservation form"
    pub entity: &'static str,
    pub rules: &'static [TransitionRule<S>],
}

impl<S: Copy + Eq + std::fmt::Display> TransitionTable<S> {
    /// Resolve the target state for `(current, action, role)`.
    ///
    /// State problems take precedence over role problems: an action that
    /// exists in the table but not from the current state is a
    /// `STATE_MISMATCH`; a matching rule whose role set excludes the
    /// actor is `FORBIDDEN`.
    pub fn resolve(&self, current: S, action: ChangeType, role: Role) -> DealdeskResult<S> {
        let mut role_mismatch = false;
        let mut action_known = false;

        for rule in self.rules {
            if rule.action != action {
                continue;
            }
            action_known = true;
            if rule.from != current {
                continue;
            }
            if rule.roles.contains(&role) {
                return Ok(rule.to);
            }
            role_mismatch = true;
        }

        if role_mismatch {
            return Err(DealdeskError::forbidden(format!(
                "Role {role} may not {action} a {}",
                self.entity.to_lowercase()
            )));
        }
        if action_known {
            let expected: Vec<String> = self
                .rules
                .iter()
                .filter(|r| r.action == action)
                .map(|r| r.from.to_string().replace('_', " "))
                .collect();
            return Err(DealdeskError::state_mismatch(format!(
                "{} is not {}",
                self.entity,
                expected.join(" or ")
            )));
        }
        Err(DealdeskError::state_mismatch(format!(
            "{} does not support {action}",
            self.entity
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealdesk_core::models::ReservationStatus;

    const TABLE: TransitionTable<ReservationStatus> = TransitionTable {
        entity: "Reservation form",
        rules: &[
            TransitionRule {
                from: ReservationStatus::PendingApproval,
                action: ChangeType::ApproveFm,
                roles: &[Role::FinancialManager],
                to: ReservationStatus::Approved,
            },
            TransitionRule {
                from: ReservationStatus::PendingApproval,
                action: ChangeType::Reject,
                roles: &[Role::FinancialManager],
                to: ReservationStatus::Rejected,
            },
        ],
    };

    #[test]
    fn test_resolves_permitted_transition() {
        let next = TABLE
            .resolve(
                ReservationStatus::PendingApproval,
                ChangeType::ApproveFm,
                Role::FinancialManager,
            )
            .unwrap();
        assert_eq!(next, ReservationStatus::Approved);
    }

    #[test]
    fn test_wrong_role_is_forbidden() {
        let err = TABLE
            .resolve(
                ReservationStatus::PendingApproval,
                ChangeType::ApproveFm,
                Role::PropertyConsultant,
            )
            .unwrap_err();
        assert!(matches!(err, DealdeskError::Forbidden(_)));
    }

    #[test]
    fn test_wrong_state_message_names_expected_state() {
        let err = TABLE
            .resolve(
                ReservationStatus::Approved,
                ChangeType::ApproveFm,
                Role::FinancialManager,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Reservation form is not pending approval");
    }

    #[test]
    fn test_unknown_action_is_state_mismatch() {
        let err = TABLE
            .resolve(
                ReservationStatus::PendingApproval,
                ChangeType::Execute,
                Role::FinancialManager,
            )
            .unwrap_err();
        assert!(matches!(err, DealdeskError::StateMismatch(_)));
    }
}
