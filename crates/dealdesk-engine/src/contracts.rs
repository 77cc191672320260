//! Contracts: drafted from approved reservations, locked settings,
//! CM -> TM approval and execution.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use dealdesk_core::models::{
    ChangeType, Contract, ContractSettings, ContractStatus, EntityKind, HistoryEntry,
    NotificationKind, Principal, ReservationStatus, Role,
};
use dealdesk_core::{DealdeskError, DealdeskResult};
use dealdesk_store::{repo, serializable_tx, SqlxResultExt};

use crate::machine::{TransitionRule, TransitionTable};
use crate::notify::{dispatch, router, NotificationSink};

const CONTRACT_TABLE: TransitionTable<ContractStatus> = TransitionTable {
    entity: "Contract",
    rules: &[
        TransitionRule {
            from: ContractStatus::Draft,
            action: ChangeType::Submit,
            roles: &[Role::ContractAdmin, Role::Admin],
            to: ContractStatus::PendingCm,
        },
        TransitionRule {
            from: ContractStatus::PendingCm,
            action: ChangeType::ApproveCm,
            roles: &[Role::ContractManager, Role::Admin],
            to: ContractStatus::PendingTm,
        },
        TransitionRule {
            from: ContractStatus::PendingCm,
            action: ChangeType::Reject,
            roles: &[Role::ContractManager, Role::Admin],
            to: ContractStatus::Rejected,
        },
        TransitionRule {
            from: ContractStatus::PendingTm,
            action: ChangeType::ApproveTm,
            roles: &[Role::TopManagement, Role::Admin],
            to: ContractStatus::Approved,
        },
        TransitionRule {
            from: ContractStatus::PendingTm,
            action: ChangeType::Reject,
            roles: &[Role::TopManagement, Role::Admin],
            to: ContractStatus::Rejected,
        },
        TransitionRule {
            from: ContractStatus::Approved,
            action: ChangeType::Execute,
            roles: &[Role::ContractAdmin, Role::Admin],
            to: ContractStatus::Executed,
        },
    ],
};

pub struct ContractService {
    pool: PgPool,
    sink: Arc<dyn NotificationSink>,
}

impl ContractService {
    pub fn new(pool: PgPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, sink }
    }

    /// Draft a contract from an approved reservation form. The plan
    /// snapshot is frozen into the contract details.
    pub async fn create(
        &self,
        principal: Principal,
        reservation_form_id: Uuid,
    ) -> DealdeskResult<Contract> {
        if !matches!(principal.role, Role::ContractAdmin | Role::Admin) {
            return Err(DealdeskError::forbidden(format!(
                "Role {} may not draft contracts",
                principal.role
            )));
        }

        let mut tx = serializable_tx(&self.pool).await?;
        let form = repo::reservations::find_by_id_for_update(&mut tx, reservation_form_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Reservation form"))?;
        if form.status != ReservationStatus::Approved {
            return Err(DealdeskError::invariant(
                "Contracts require an approved reservation form",
            ));
        }
        let plan = repo::plans::find_by_id(&mut tx, form.payment_plan_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Payment plan"))?;

        let contract = Contract {
            id: Uuid::new_v4(),
            reservation_form_id: form.id,
            status: ContractStatus::Draft,
            contract_settings_locked: false,
            settings: ContractSettings::default(),
            details: plan.details.clone(),
            created_by: principal.user_id,
            created_at: Utc::now(),
        };
        repo::contracts::insert(&mut tx, &contract).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Contract,
            &HistoryEntry::new(contract.id, ChangeType::Create, principal.user_id)
                .with_new(json!({ "status": contract.status.as_str() })),
        )
        .await?;
        let events = router::contract_stage(
            contract.id,
            NotificationKind::ContractDrafted,
            &[Role::ContractManager],
            "A contract was drafted",
        );

        tx.commit().await.db()?;
        info!(contract_id = %contract.id, form_id = %form.id, "contract drafted");
        dispatch(self.sink.as_ref(), events).await;
        Ok(contract)
    }

    /// Edit settings while the contract is a draft and unlocked.
    pub async fn update_settings(
        &self,
        principal: Principal,
        contract_id: Uuid,
        settings: ContractSettings,
    ) -> DealdeskResult<Contract> {
        if !matches!(principal.role, Role::ContractAdmin | Role::Admin) {
            return Err(DealdeskError::forbidden(format!(
                "Role {} may not edit contract settings",
                principal.role
            )));
        }

        let mut tx = serializable_tx(&self.pool).await?;
        let contract = repo::contracts::find_by_id_for_update(&mut tx, contract_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Contract"))?;
        if contract.contract_settings_locked {
            return Err(DealdeskError::state_mismatch("Contract settings are locked"));
        }
        if contract.status != ContractStatus::Draft {
            return Err(DealdeskError::state_mismatch("Contract is not a draft"));
        }

        repo::contracts::update_settings(&mut tx, contract_id, &settings).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Contract,
            &HistoryEntry::new(contract_id, ChangeType::UpdateSettings, principal.user_id)
                .with_old(serde_json::to_value(&contract.settings)?)
                .with_new(serde_json::to_value(&settings)?),
        )
        .await?;

        tx.commit().await.db()?;
        Ok(Contract {
            settings,
            ..contract
        })
    }

    /// One-way settings lock, required before submission.
    pub async fn lock_settings(
        &self,
        principal: Principal,
        contract_id: Uuid,
    ) -> DealdeskResult<Contract> {
        if !matches!(principal.role, Role::ContractAdmin | Role::Admin) {
            return Err(DealdeskError::forbidden(format!(
                "Role {} may not lock contract settings",
                principal.role
            )));
        }

        let mut tx = serializable_tx(&self.pool).await?;
        let contract = repo::contracts::find_by_id_for_update(&mut tx, contract_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Contract"))?;
        if contract.contract_settings_locked {
            return Err(DealdeskError::state_mismatch(
                "Contract settings are already locked",
            ));
        }

        repo::contracts::lock_settings(&mut tx, contract_id).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Contract,
            &HistoryEntry::new(contract_id, ChangeType::LockSettings, principal.user_id)
                .with_new(json!({ "contract_settings_locked": true })),
        )
        .await?;

        tx.commit().await.db()?;
        Ok(Contract {
            contract_settings_locked: true,
            ..contract
        })
    }

    /// Submit the draft to the CM queue; settings must be locked.
    pub async fn submit(&self, principal: Principal, contract_id: Uuid) -> DealdeskResult<Contract> {
        let mut tx = serializable_tx(&self.pool).await?;
        let contract = repo::contracts::find_by_id_for_update(&mut tx, contract_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Contract"))?;
        let next = CONTRACT_TABLE.resolve(contract.status, ChangeType::Submit, principal.role)?;
        if !contract.contract_settings_locked {
            return Err(DealdeskError::invariant(
                "Contract settings must be locked before submission",
            ));
        }

        repo::contracts::update_status(&mut tx, contract_id, next).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Contract,
            &HistoryEntry::new(contract_id, ChangeType::Submit, principal.user_id)
                .with_old(json!({ "status": contract.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::contract_stage(
            contract_id,
            NotificationKind::ContractSubmitted,
            &[Role::ContractManager],
            "A contract is awaiting CM approval",
        );

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(Contract {
            status: next,
            ..contract
        })
    }

    pub async fn approve_cm(
        &self,
        principal: Principal,
        contract_id: Uuid,
    ) -> DealdeskResult<Contract> {
        self.transition(
            principal,
            contract_id,
            ChangeType::ApproveCm,
            NotificationKind::ContractApprovedCm,
            &[Role::TopManagement],
            "A contract is awaiting TM approval",
        )
        .await
    }

    pub async fn approve_tm(
        &self,
        principal: Principal,
        contract_id: Uuid,
    ) -> DealdeskResult<Contract> {
        self.transition(
            principal,
            contract_id,
            ChangeType::ApproveTm,
            NotificationKind::ContractApprovedTm,
            &[Role::ContractAdmin],
            "The contract is approved and ready for execution",
        )
        .await
    }

    pub async fn reject(&self, principal: Principal, contract_id: Uuid) -> DealdeskResult<Contract> {
        self.transition(
            principal,
            contract_id,
            ChangeType::Reject,
            NotificationKind::ContractRejected,
            &[Role::ContractAdmin],
            "The contract was rejected",
        )
        .await
    }

    pub async fn execute(&self, principal: Principal, contract_id: Uuid) -> DealdeskResult<Contract> {
        self.transition(
            principal,
            contract_id,
            ChangeType::Execute,
            NotificationKind::ContractExecuted,
            &[Role::ContractManager, Role::TopManagement],
            "The contract was executed",
        )
        .await
    }

    async fn transition(
        &self,
        principal: Principal,
        contract_id: Uuid,
        action: ChangeType,
        kind: NotificationKind,
        notify_roles: &[Role],
        message: &str,
    ) -> DealdeskResult<Contract> {
        let mut tx = serializable_tx(&self.pool).await?;
        let contract = repo::contracts::find_by_id_for_update(&mut tx, contract_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Contract"))?;
        let next = CONTRACT_TABLE.resolve(contract.status, action, principal.role)?;

        repo::contracts::update_status(&mut tx, contract_id, next).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Contract,
            &HistoryEntry::new(contract_id, action, principal.user_id)
                .with_old(json!({ "status": contract.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::contract_stage(contract_id, kind, notify_roles, message);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(Contract {
            status: next,
            ..contract
        })
    }

    pub async fn get(&self, contract_id: Uuid) -> DealdeskResult<Contract> {
        let mut conn = self.pool.acquire().await.db()?;
        repo::contracts::find_by_id(&mut conn, contract_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Contract"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_lifecycle_order() {
        let mut status = ContractStatus::Draft;
        for (action, role) in [
            (ChangeType::Submit, Role::ContractAdmin),
            (ChangeType::ApproveCm, Role::ContractManager),
            (ChangeType::ApproveTm, Role::TopManagement),
            (ChangeType::Execute, Role::ContractAdmin),
        ] {
            status = CONTRACT_TABLE.resolve(status, action, role).unwrap();
        }
        assert_eq!(status, ContractStatus::Executed);
    }

    #[test]
    fn test_reject_reachable_from_both_pending_states() {
        assert!(CONTRACT_TABLE
            .resolve(
                ContractStatus::PendingCm,
                ChangeType::Reject,
                Role::ContractManager
            )
            .is_ok());
        assert!(CONTRACT_TABLE
            .resolve(
                ContractStatus::PendingTm,
                ChangeType::Reject,
                Role::TopManagement
            )
            .is_ok());
        // but not from draft
        assert!(CONTRACT_TABLE
            .resolve(ContractStatus::Draft, ChangeType::Reject, Role::ContractManager)
            .is_err());
    }

    #[test]
    fn test_execute_requires_approval() {
        let err = CONTRACT_TABLE
            .resolve(
                ContractStatus::PendingTm,
                ChangeType::Execute,
                Role::ContractAdmin,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Contract is not approved");
    }
}
