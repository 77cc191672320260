//! Payment plan service: creation routing, the SM -> FM -> TM approval
//! chain with policy escalation, and the accepted-plan marker.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use dealdesk_core::models::{
    BuyerInfo, ChangeType, EntityKind, GeneratedPlan, HistoryEntry, PaymentPlan, PlanStatus,
    Principal, Role, Snapshot, SnapshotV1, UnitInfo,
};
use dealdesk_core::{DealdeskError, DealdeskResult};
use dealdesk_evaluator::{evaluate_plan, PlanInputs, PlanOutcome, StdPlan};
use dealdesk_store::{repo, serializable_tx, SqlxResultExt};

use crate::machine::{TransitionRule, TransitionTable};
use crate::notify::{dispatch, router, NotificationSink};
use crate::policy;

const PLAN_TABLE: TransitionTable<PlanStatus> = TransitionTable {
    entity: "Payment plan",
    rules: &[
        TransitionRule {
            from: PlanStatus::PendingSm,
            action: ChangeType::ApproveSm,
            roles: &[Role::SalesManager, Role::Admin],
            to: PlanStatus::PendingFm,
        },
        TransitionRule {
            from: PlanStatus::PendingSm,
            action: ChangeType::Reject,
            roles: &[Role::SalesManager, Role::Admin],
            to: PlanStatus::Rejected,
        },
        TransitionRule {
            from: PlanStatus::PendingFm,
            action: ChangeType::ApproveFm,
            roles: &[Role::FinancialManager, Role::Admin],
            to: PlanStatus::Approved,
        },
        TransitionRule {
            from: PlanStatus::PendingFm,
            action: ChangeType::Reject,
            roles: &[Role::FinancialManager, Role::Admin],
            to: PlanStatus::Rejected,
        },
        TransitionRule {
            from: PlanStatus::PendingTm,
            action: ChangeType::ApproveTm,
            roles: &[Role::TopManagement, Role::Admin],
            to: PlanStatus::Approved,
        },
        TransitionRule {
            from: PlanStatus::PendingTm,
            action: ChangeType::Reject,
            roles: &[Role::TopManagement, Role::Admin],
            to: PlanStatus::Rejected,
        },
        TransitionRule {
            from: PlanStatus::Approved,
            action: ChangeType::MarkAccepted,
            roles: &[Role::FinancialManager, Role::TopManagement, Role::Admin],
            to: PlanStatus::Approved,
        },
    ],
};

/// Which approval queue to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStage {
    Sm,
    Fm,
    Tm,
}

impl QueueStage {
    fn status(&self) -> PlanStatus {
        match self {
            Self::Sm => PlanStatus::PendingSm,
            Self::Fm => PlanStatus::PendingFm,
            Self::Tm => PlanStatus::PendingTm,
        }
    }

    fn viewer_roles(&self) -> &'static [Role] {
        match self {
            Self::Sm => &[Role::SalesManager, Role::Admin],
            Self::Fm => &[Role::FinancialManager, Role::Admin],
            Self::Tm => &[Role::TopManagement, Role::Admin],
        }
    }
}

/// Parameters for proposing a plan on a deal.
#[derive(Debug, Clone)]
pub struct CreatePlanRequest {
    pub deal_id: Uuid,
    pub std_plan: StdPlan,
    pub inputs: PlanInputs,
    pub buyers: Vec<BuyerInfo>,
    pub unit: Option<UnitInfo>,
}

/// Result of an FM approval: either approved outright or escalated to
/// TM because the discount exceeds the policy limit.
#[derive(Debug, Clone)]
pub struct PlanDecision {
    pub plan: PaymentPlan,
    pub escalated: bool,
    pub policy_limit_percent: Decimal,
}

pub struct PlanService {
    pool: PgPool,
    sink: Arc<dyn NotificationSink>,
}

impl PlanService {
    pub fn new(pool: PgPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, sink }
    }

    /// Evaluate and persist a new plan. Consultant-created plans enter
    /// the SM queue, finance-side plans go straight to FM.
    pub async fn create(
        &self,
        principal: Principal,
        request: CreatePlanRequest,
    ) -> DealdeskResult<(PaymentPlan, PlanOutcome)> {
        policy::enforce_discount_authority(
            principal.role,
            request.inputs.sales_discount_percent,
        )?;

        let mut tx = serializable_tx(&self.pool).await?;

        let active = policy::active_policy(&mut tx).await?;
        let outcome = evaluate_plan(&request.std_plan, &request.inputs, &active.thresholds)?;

        let deal = repo::deals::find_by_id_for_update(&mut tx, request.deal_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Deal"))?;

        let snapshot = Snapshot::v1(SnapshotV1 {
            buyers: request.buyers,
            unit: request.unit,
            generated_plan: Some(GeneratedPlan {
                schedule: outcome.schedule.clone(),
                totals: outcome.totals.clone(),
                sales_discount_percent: request.inputs.sales_discount_percent,
            }),
            evaluation: Some(outcome.evaluation.clone()),
        });

        let status = PlanStatus::initial_for(principal.role);
        let plan = PaymentPlan {
            id: Uuid::new_v4(),
            deal_id: deal.id,
            details: snapshot.to_blob()?,
            created_by: principal.user_id,
            status,
            accepted: false,
            version: repo::plans::next_version(&mut tx, deal.id).await?,
            created_at: Utc::now(),
        };
        repo::plans::insert(&mut tx, &plan).await?;

        repo::history::append(
            &mut tx,
            EntityKind::PaymentPlan,
            &HistoryEntry::new(plan.id, ChangeType::Create, principal.user_id)
                .with_new(json!({ "status": status.as_str(), "version": plan.version })),
        )
        .await?;

        let queue_role = match status {
            PlanStatus::PendingSm => Role::SalesManager,
            _ => Role::FinancialManager,
        };
        let events = router::plan_submitted(plan.id, queue_role);

        tx.commit().await.db()?;
        info!(plan_id = %plan.id, deal_id = %deal.id, status = %status, "payment plan created");
        dispatch(self.sink.as_ref(), events).await;

        Ok((plan, outcome))
    }

    /// SM approval: forwards the plan to the FM queue.
    pub async fn approve_sm(
        &self,
        principal: Principal,
        plan_id: Uuid,
    ) -> DealdeskResult<PaymentPlan> {
        let mut tx = serializable_tx(&self.pool).await?;
        let plan = repo::plans::find_by_id_for_update(&mut tx, plan_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Payment plan"))?;

        let next = PLAN_TABLE.resolve(plan.status, ChangeType::ApproveSm, principal.role)?;
        repo::plans::update_status(&mut tx, plan_id, next).await?;
        repo::history::append(
            &mut tx,
            EntityKind::PaymentPlan,
            &HistoryEntry::new(plan_id, ChangeType::ApproveSm, principal.user_id)
                .with_old(json!({ "status": plan.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::plan_forwarded(plan_id, Role::FinancialManager);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(PaymentPlan {
            status: next,
            ..plan
        })
    }

    /// FM approval. Discounts above the policy limit escalate to TM
    /// instead of approving.
    pub async fn approve_fm(
        &self,
        principal: Principal,
        plan_id: Uuid,
    ) -> DealdeskResult<PlanDecision> {
        let mut tx = serializable_tx(&self.pool).await?;
        let plan = repo::plans::find_by_id_for_update(&mut tx, plan_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Payment plan"))?;

        PLAN_TABLE.resolve(plan.status, ChangeType::ApproveFm, principal.role)?;

        let active = policy::active_policy(&mut tx).await?;
        let snapshot = Snapshot::from_blob(&plan.details)?;
        let discount = snapshot
            .payload()
            .generated_plan
            .as_ref()
            .map(|g| g.sales_discount_percent)
            .unwrap_or(Decimal::ZERO);

        let escalated = policy::requires_tm_escalation(&active, discount);
        let (next, change, events) = if escalated {
            (
                PlanStatus::PendingTm,
                ChangeType::Escalate,
                router::plan_escalated(plan_id, plan.created_by),
            )
        } else {
            (
                PlanStatus::Approved,
                ChangeType::ApproveFm,
                router::plan_decided(plan_id, plan.created_by, true),
            )
        };

        repo::plans::update_status(&mut tx, plan_id, next).await?;
        repo::history::append(
            &mut tx,
            EntityKind::PaymentPlan,
            &HistoryEntry::new(plan_id, change, principal.user_id)
                .with_old(json!({ "status": plan.status.as_str() }))
                .with_new(json!({ "status": next.as_str(), "discount_percent": discount })),
        )
        .await?;

        tx.commit().await.db()?;
        if escalated {
            info!(plan_id = %plan_id, %discount, limit = %active.policy_limit_percent,
                "plan escalated to top management");
        }
        dispatch(self.sink.as_ref(), events).await;

        Ok(PlanDecision {
            plan: PaymentPlan {
                status: next,
                ..plan
            },
            escalated,
            policy_limit_percent: active.policy_limit_percent,
        })
    }

    /// TM approval of an escalated plan.
    pub async fn approve_tm(
        &self,
        principal: Principal,
        plan_id: Uuid,
    ) -> DealdeskResult<PaymentPlan> {
        let mut tx = serializable_tx(&self.pool).await?;
        let plan = repo::plans::find_by_id_for_update(&mut tx, plan_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Payment plan"))?;

        let next = PLAN_TABLE.resolve(plan.status, ChangeType::ApproveTm, principal.role)?;
        repo::plans::update_status(&mut tx, plan_id, next).await?;
        repo::history::append(
            &mut tx,
            EntityKind::PaymentPlan,
            &HistoryEntry::new(plan_id, ChangeType::ApproveTm, principal.user_id)
                .with_old(json!({ "status": plan.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::plan_decided(plan_id, plan.created_by, true);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(PaymentPlan {
            status: next,
            ..plan
        })
    }

    /// Rejection at whichever pending stage the actor's role gates.
    pub async fn reject(
        &self,
        principal: Principal,
        plan_id: Uuid,
    ) -> DealdeskResult<PaymentPlan> {
        let mut tx = serializable_tx(&self.pool).await?;
        let plan = repo::plans::find_by_id_for_update(&mut tx, plan_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Payment plan"))?;

        let next = PLAN_TABLE.resolve(plan.status, ChangeType::Reject, principal.role)?;
        repo::plans::update_status(&mut tx, plan_id, next).await?;
        repo::history::append(
            &mut tx,
            EntityKind::PaymentPlan,
            &HistoryEntry::new(plan_id, ChangeType::Reject, principal.user_id)
                .with_old(json!({ "status": plan.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::plan_decided(plan_id, plan.created_by, false);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(PaymentPlan {
            status: next,
            ..plan
        })
    }

    /// Mark an approved plan as the deal's accepted plan, clearing the
    /// flag on every sibling in the same transaction.
    pub async fn mark_accepted(
        &self,
        principal: Principal,
        plan_id: Uuid,
    ) -> DealdeskResult<PaymentPlan> {
        let mut tx = serializable_tx(&self.pool).await?;
        let plan = repo::plans::find_by_id_for_update(&mut tx, plan_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Payment plan"))?;

        PLAN_TABLE.resolve(plan.status, ChangeType::MarkAccepted, principal.role)?;

        repo::plans::clear_accepted(&mut tx, plan.deal_id).await?;
        repo::plans::mark_accepted(&mut tx, plan_id).await?;
        repo::history::append(
            &mut tx,
            EntityKind::PaymentPlan,
            &HistoryEntry::new(plan_id, ChangeType::MarkAccepted, principal.user_id)
                .with_new(json!({ "accepted": true })),
        )
        .await?;
        let events = router::plan_accepted(plan_id, plan.created_by);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(PaymentPlan {
            accepted: true,
            ..plan
        })
    }

    /// Role-gated approval queue listing.
    pub async fn queue(
        &self,
        principal: Principal,
        stage: QueueStage,
    ) -> DealdeskResult<Vec<PaymentPlan>> {
        if !stage.viewer_roles().contains(&principal.role) {
            return Err(DealdeskError::forbidden(format!(
                "Role {} may not view this queue",
                principal.role
            )));
        }
        let mut conn = self.pool.acquire().await.db()?;
        repo::plans::queue(&mut conn, stage.status()).await
    }

    pub async fn get(&self, plan_id: Uuid) -> DealdeskResult<PaymentPlan> {
        let mut conn = self.pool.acquire().await.db()?;
        repo::plans::find_by_id(&mut conn, plan_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Payment plan"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_table_shape() {
        // FM approve resolves to approved; escalation is a service
        // decision layered on top
        let next = PLAN_TABLE
            .resolve(
                PlanStatus::PendingFm,
                ChangeType::ApproveFm,
                Role::FinancialManager,
            )
            .unwrap();
        assert_eq!(next, PlanStatus::Approved);

        // SM cannot act on the FM queue
        assert!(PLAN_TABLE
            .resolve(
                PlanStatus::PendingFm,
                ChangeType::ApproveFm,
                Role::SalesManager
            )
            .is_err());

        // mark-accepted only on approved plans
        let err = PLAN_TABLE
            .resolve(
                PlanStatus::PendingTm,
                ChangeType::MarkAccepted,
                Role::FinancialManager,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Payment plan is not approved");
    }

    #[test]
    fn test_queue_viewer_roles() {
        assert!(QueueStage::Sm.viewer_roles().contains(&Role::SalesManager));
        assert!(!QueueStage::Sm.viewer_roles().contains(&Role::FinancialManager));
        assert_eq!(QueueStage::Tm.status(), PlanStatus::PendingTm);
    }
}
