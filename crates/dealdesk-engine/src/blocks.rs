//! Block lifecycle: request, financial approval, extension, cancel,
//! expiry, and the SM -> FM -> TM authority override chain.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use dealdesk_core::models::{
    Block, BlockStatus, ChangeType, EntityKind, FinancialDecision, HistoryEntry, OverrideStatus,
    Principal, Role, Snapshot, UnitStatus, MAX_BLOCK_DAYS, MIN_BLOCK_DAYS,
};
use dealdesk_core::{DealdeskError, DealdeskResult};
use dealdesk_store::{repo, serializable_tx, SqlxResultExt};

use crate::machine::{TransitionRule, TransitionTable};
use crate::notify::{dispatch, router, NotificationSink};

const BLOCK_TABLE: TransitionTable<BlockStatus> = TransitionTable {
    entity: "Block",
    rules: &[
        TransitionRule {
            from: BlockStatus::Pending,
            action: ChangeType::ApproveFm,
            roles: &[Role::FinancialManager, Role::Admin],
            to: BlockStatus::Approved,
        },
        TransitionRule {
            from: BlockStatus::Pending,
            action: ChangeType::Reject,
            roles: &[Role::FinancialManager, Role::Admin],
            to: BlockStatus::Rejected,
        },
        TransitionRule {
            from: BlockStatus::Pending,
            action: ChangeType::Cancel,
            roles: &[
                Role::PropertyConsultant,
                Role::FinancialManager,
                Role::FinancialAdmin,
                Role::Admin,
            ],
            to: BlockStatus::Expired,
        },
        TransitionRule {
            from: BlockStatus::Approved,
            action: ChangeType::Cancel,
            roles: &[Role::FinancialManager, Role::FinancialAdmin, Role::Admin],
            to: BlockStatus::Expired,
        },
    ],
};

/// Interval between hold reminders on an active block.
const HOLD_REMINDER_INTERVAL_DAYS: i64 = 7;

/// Parameters for requesting a hold on a unit.
#[derive(Debug, Clone)]
pub struct BlockRequest {
    pub unit_id: Uuid,
    pub duration_days: i32,
    pub reason: Option<String>,
    /// Plan whose financial verdict backs this request, if any
    pub payment_plan_id: Option<Uuid>,
}

pub struct BlockService {
    pool: PgPool,
    sink: Arc<dyn NotificationSink>,
}

impl BlockService {
    pub fn new(pool: PgPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, sink }
    }

    /// Request a hold. The unit must be free: available, and not held by
    /// another approved block whose window is still open.
    pub async fn request(
        &self,
        principal: Principal,
        request: BlockRequest,
    ) -> DealdeskResult<Block> {
        if !(MIN_BLOCK_DAYS..=MAX_BLOCK_DAYS).contains(&request.duration_days) {
            return Err(DealdeskError::invalid_field(
                "duration_days",
                format!("Duration must be between {MIN_BLOCK_DAYS} and {MAX_BLOCK_DAYS} days"),
            ));
        }

        let now = Utc::now();
        let mut tx = serializable_tx(&self.pool).await?;

        let unit = repo::units::find_by_id_for_update(&mut tx, request.unit_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Unit"))?;

        if repo::blocks::find_active_for_unit(&mut tx, unit.id, now)
            .await?
            .is_some()
        {
            return Err(DealdeskError::invariant("Unit is already blocked"));
        }
        if !unit.available || unit.unit_status != UnitStatus::Available {
            return Err(DealdeskError::invariant("Unit is not available"));
        }

        // Carry the financial verdict of the backing plan; a REJECT keeps
        // FM approval locked until the override chain clears it.
        let financial_decision = match request.payment_plan_id {
            Some(plan_id) => {
                let plan = repo::plans::find_by_id(&mut tx, plan_id)
                    .await?
                    .ok_or_else(|| DealdeskError::not_found("Payment plan"))?;
                let snapshot = Snapshot::from_blob(&plan.details)?;
                Some(if snapshot.evaluator_accepted() {
                    FinancialDecision::Accept
                } else {
                    FinancialDecision::Reject
                })
            }
            None => None,
        };

        let block = Block {
            id: Uuid::new_v4(),
            unit_id: unit.id,
            requested_by: principal.user_id,
            duration_days: request.duration_days,
            status: BlockStatus::Pending,
            override_status: OverrideStatus::None,
            blocked_until: now + Duration::days(request.duration_days as i64),
            extension_count: 0,
            financial_decision,
            reason: request.reason,
            next_notify_at: None,
            created_at: now,
        };
        repo::blocks::insert(&mut tx, &block).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Block,
            &HistoryEntry::new(block.id, ChangeType::Create, principal.user_id).with_new(json!({
                "status": block.status.as_str(),
                "duration_days": block.duration_days,
            })),
        )
        .await?;
        let events = router::block_requested(block.id);

        tx.commit().await.db()?;
        info!(block_id = %block.id, unit_id = %unit.id, "block requested");
        dispatch(self.sink.as_ref(), events).await;
        Ok(block)
    }

    /// FM approval: flips the unit to BLOCKED. A recorded financial
    /// REJECT requires an approved override first.
    pub async fn approve(&self, principal: Principal, block_id: Uuid) -> DealdeskResult<Block> {
        let now = Utc::now();
        let mut tx = serializable_tx(&self.pool).await?;

        let block = repo::blocks::find_by_id_for_update(&mut tx, block_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Block"))?;
        let next = BLOCK_TABLE.resolve(block.status, ChangeType::ApproveFm, principal.role)?;

        if block.financial_decision == Some(FinancialDecision::Reject)
            && block.override_status != OverrideStatus::Approved
        {
            return Err(DealdeskError::invariant(
                "Financial criteria were rejected; an approved override is required",
            ));
        }

        let unit = repo::units::find_by_id_for_update(&mut tx, block.unit_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Unit"))?;
        if !unit.available {
            return Err(DealdeskError::invariant("Unit is not available"));
        }

        let blocked_until = now + Duration::days(block.duration_days as i64);
        repo::blocks::update_status(&mut tx, block_id, next).await?;
        if block.financial_decision.is_none() {
            repo::blocks::set_financial_decision(&mut tx, block_id, FinancialDecision::Accept)
                .await?;
        }
        // the hold window starts at approval, as does the reminder clock
        repo::blocks::extend(&mut tx, block_id, blocked_until, 0).await?;
        repo::blocks::set_next_notify(
            &mut tx,
            block_id,
            now + Duration::days(HOLD_REMINDER_INTERVAL_DAYS),
        )
        .await?;
        repo::units::set_state(&mut tx, unit.id, UnitStatus::Blocked).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Block,
            &HistoryEntry::new(block_id, ChangeType::ApproveFm, principal.user_id)
                .with_old(json!({ "status": block.status.as_str() }))
                .with_new(json!({ "status": next.as_str(), "blocked_until": blocked_until })),
        )
        .await?;
        let events = router::block_decided(block_id, block.requested_by, true);

        tx.commit().await.db()?;
        info!(block_id = %block_id, unit_id = %unit.id, "block approved, unit held");
        dispatch(self.sink.as_ref(), events).await;
        Ok(Block {
            status: next,
            blocked_until,
            ..block
        })
    }

    pub async fn reject(&self, principal: Principal, block_id: Uuid) -> DealdeskResult<Block> {
        let mut tx = serializable_tx(&self.pool).await?;
        let block = repo::blocks::find_by_id_for_update(&mut tx, block_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Block"))?;
        let next = BLOCK_TABLE.resolve(block.status, ChangeType::Reject, principal.role)?;

        repo::blocks::update_status(&mut tx, block_id, next).await?;
        repo::blocks::set_financial_decision(&mut tx, block_id, FinancialDecision::Reject).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Block,
            &HistoryEntry::new(block_id, ChangeType::Reject, principal.user_id)
                .with_old(json!({ "status": block.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::block_decided(block_id, block.requested_by, false);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(Block {
            status: next,
            financial_decision: Some(FinancialDecision::Reject),
            ..block
        })
    }

    /// FM extension of an active hold, bounded by the extension count
    /// and the 28-day total-duration ceiling.
    pub async fn extend(
        &self,
        principal: Principal,
        block_id: Uuid,
        additional_days: i32,
    ) -> DealdeskResult<Block> {
        if !matches!(
            principal.role,
            Role::FinancialManager | Role::Admin
        ) {
            return Err(DealdeskError::forbidden(format!(
                "Role {} may not extend a block",
                principal.role
            )));
        }

        let mut tx = serializable_tx(&self.pool).await?;
        let block = repo::blocks::find_by_id_for_update(&mut tx, block_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Block"))?;
        if block.status != BlockStatus::Approved {
            return Err(DealdeskError::state_mismatch("Block is not approved"));
        }
        if !block.extension_allowed(additional_days) {
            return Err(DealdeskError::invariant(format!(
                "Extension of {additional_days} days exceeds the block duration limits"
            )));
        }

        let blocked_until = block.blocked_until + Duration::days(additional_days as i64);
        let extension_count = block.extension_count + 1;
        repo::blocks::extend(&mut tx, block_id, blocked_until, extension_count).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Block,
            &HistoryEntry::new(block_id, ChangeType::Extend, principal.user_id)
                .with_old(json!({ "blocked_until": block.blocked_until }))
                .with_new(json!({
                    "blocked_until": blocked_until,
                    "extension_count": extension_count,
                })),
        )
        .await?;
        let events = router::block_extended(block_id, block.requested_by);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(Block {
            blocked_until,
            extension_count,
            ..block
        })
    }

    /// Cancel a pending or active hold, returning the unit to inventory
    /// when this block held it.
    pub async fn cancel(&self, principal: Principal, block_id: Uuid) -> DealdeskResult<Block> {
        let mut tx = serializable_tx(&self.pool).await?;
        let block = repo::blocks::find_by_id_for_update(&mut tx, block_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Block"))?;
        let was_active = block.status == BlockStatus::Approved;
        let next = BLOCK_TABLE.resolve(block.status, ChangeType::Cancel, principal.role)?;

        repo::blocks::update_status(&mut tx, block_id, next).await?;
        if was_active {
            release_unit_if_blocked(&mut tx, block.unit_id).await?;
        }
        repo::history::append(
            &mut tx,
            EntityKind::Block,
            &HistoryEntry::new(block_id, ChangeType::Cancel, principal.user_id)
                .with_old(json!({ "status": block.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;

        tx.commit().await.db()?;
        Ok(Block {
            status: next,
            ..block
        })
    }

    /// Advance the override chain one stage. SM clears the first stage,
    /// FM the second, TM the last; TM may jump from any pending stage,
    /// recorded as a bypass.
    pub async fn override_approve(
        &self,
        principal: Principal,
        block_id: Uuid,
    ) -> DealdeskResult<Block> {
        let mut tx = serializable_tx(&self.pool).await?;
        let block = repo::blocks::find_by_id_for_update(&mut tx, block_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Block"))?;

        if matches!(
            block.override_status,
            OverrideStatus::Approved | OverrideStatus::Rejected
        ) {
            return Err(DealdeskError::state_mismatch(
                "Block override is already decided",
            ));
        }

        let (next, change) = next_override_stage(block.override_status, principal.role)?;
        repo::blocks::update_override_status(&mut tx, block_id, next).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Block,
            &HistoryEntry::new(block_id, change, principal.user_id)
                .with_old(json!({ "override_status": block.override_status.as_str() }))
                .with_new(json!({ "override_status": next.as_str() })),
        )
        .await?;

        let events = if next == OverrideStatus::Approved {
            router::block_override_decided(block_id, block.requested_by, true)
        } else {
            router::block_override_stage(block_id, stage_role(next))
        };

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(Block {
            override_status: next,
            ..block
        })
    }

    /// Reject the override at any pending stage.
    pub async fn override_reject(
        &self,
        principal: Principal,
        block_id: Uuid,
    ) -> DealdeskResult<Block> {
        if !matches!(
            principal.role,
            Role::SalesManager | Role::FinancialManager | Role::TopManagement | Role::Admin
        ) {
            return Err(DealdeskError::forbidden(format!(
                "Role {} may not decide a block override",
                principal.role
            )));
        }

        let mut tx = serializable_tx(&self.pool).await?;
        let block = repo::blocks::find_by_id_for_update(&mut tx, block_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Block"))?;
        if matches!(
            block.override_status,
            OverrideStatus::Approved | OverrideStatus::Rejected
        ) {
            return Err(DealdeskError::state_mismatch(
                "Block override is already decided",
            ));
        }

        repo::blocks::update_override_status(&mut tx, block_id, OverrideStatus::Rejected).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Block,
            &HistoryEntry::new(block_id, ChangeType::OverrideReject, principal.user_id)
                .with_old(json!({ "override_status": block.override_status.as_str() }))
                .with_new(json!({ "override_status": OverrideStatus::Rejected.as_str() })),
        )
        .await?;
        let events = router::block_override_decided(block_id, block.requested_by, false);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(Block {
            override_status: OverrideStatus::Rejected,
            ..block
        })
    }

    pub async fn get(&self, block_id: Uuid) -> DealdeskResult<Block> {
        let mut conn = self.pool.acquire().await.db()?;
        repo::blocks::find_by_id(&mut conn, block_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Block"))
    }
}

/// Restore a unit to inventory if it is still in the BLOCKED state.
/// Units that moved on to RESERVED or SOLD are left alone.
pub(crate) async fn release_unit_if_blocked(
    conn: &mut dealdesk_store::Conn,
    unit_id: Uuid,
) -> DealdeskResult<()> {
    if let Some(unit) = repo::units::find_by_id_for_update(conn, unit_id).await? {
        if unit.unit_status == UnitStatus::Blocked {
            repo::units::set_state(conn, unit_id, UnitStatus::Available).await?;
        }
    }
    Ok(())
}

/// Resolve the override stage an actor may clear from the current one.
fn next_override_stage(
    current: OverrideStatus,
    role: Role,
) -> DealdeskResult<(OverrideStatus, ChangeType)> {
    match (current, role) {
        // chain start or SM stage
        (
            OverrideStatus::None | OverrideStatus::PendingSm,
            Role::SalesManager | Role::Admin,
        ) => Ok((OverrideStatus::PendingFm, ChangeType::OverrideSm)),
        (OverrideStatus::PendingFm, Role::FinancialManager | Role::Admin) => {
            Ok((OverrideStatus::PendingTm, ChangeType::OverrideFm))
        }
        (OverrideStatus::PendingTm, Role::TopManagement) => {
            Ok((OverrideStatus::Approved, ChangeType::OverrideTm))
        }
        // TM may jump over the earlier stages
        (
            OverrideStatus::None | OverrideStatus::PendingSm | OverrideStatus::PendingFm,
            Role::TopManagement,
        ) => Ok((OverrideStatus::Approved, ChangeType::ApproveTmBypass)),
        (
            OverrideStatus::None
            | OverrideStatus::PendingSm
            | OverrideStatus::PendingFm
            | OverrideStatus::PendingTm,
            _,
        ) => Err(DealdeskError::forbidden(format!(
            "Role {role} may not clear the current override stage"
        ))),
        _ => Err(DealdeskError::state_mismatch(
            "Block override is already decided",
        )),
    }
}

/// The role gating a pending override stage.
fn stage_role(status: OverrideStatus) -> Option<Role> {
    match status {
        OverrideStatus::PendingSm => Some(Role::SalesManager),
        OverrideStatus::PendingFm => Some(Role::FinancialManager),
        OverrideStatus::PendingTm => Some(Role::TopManagement),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_chain_walks_sm_fm_tm() {
        let (next, change) =
            next_override_stage(OverrideStatus::None, Role::SalesManager).unwrap();
        assert_eq!(next, OverrideStatus::PendingFm);
        assert_eq!(change, ChangeType::OverrideSm);

        let (next, _) = next_override_stage(OverrideStatus::PendingFm, Role::FinancialManager)
            .unwrap();
        assert_eq!(next, OverrideStatus::PendingTm);

        let (next, change) =
            next_override_stage(OverrideStatus::PendingTm, Role::TopManagement).unwrap();
        assert_eq!(next, OverrideStatus::Approved);
        assert_eq!(change, ChangeType::OverrideTm);
    }

    #[test]
    fn test_tm_bypass_recorded() {
        let (next, change) =
            next_override_stage(OverrideStatus::None, Role::TopManagement).unwrap();
        assert_eq!(next, OverrideStatus::Approved);
        assert_eq!(change, ChangeType::ApproveTmBypass);
    }

    #[test]
    fn test_out_of_turn_role_forbidden() {
        assert!(next_override_stage(OverrideStatus::PendingFm, Role::SalesManager).is_err());
        assert!(next_override_stage(OverrideStatus::PendingSm, Role::FinancialManager).is_err());
    }

    #[test]
    fn test_block_table_cancel_roles() {
        // a consultant may cancel their pending request but not an
        // approved hold
        assert!(BLOCK_TABLE
            .resolve(
                BlockStatus::Pending,
                ChangeType::Cancel,
                Role::PropertyConsultant
            )
            .is_ok());
        assert!(BLOCK_TABLE
            .resolve(
                BlockStatus::Approved,
                ChangeType::Cancel,
                Role::PropertyConsultant
            )
            .is_err());
    }
}
