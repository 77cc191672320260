//! Deals: creation from a calculator snapshot, submission, approval
//! gated on the evaluator verdict or an approved override.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use dealdesk_core::models::{
    ChangeType, Deal, DealStatus, EntityKind, HistoryEntry, Principal, Role, Snapshot,
};
use dealdesk_core::{DealdeskError, DealdeskResult};
use dealdesk_store::{repo, serializable_tx, SqlxResultExt};

use crate::machine::{TransitionRule, TransitionTable};
use crate::notify::{dispatch, router, NotificationSink};

const DEAL_TABLE: TransitionTable<DealStatus> = TransitionTable {
    entity: "Deal",
    rules: &[
        TransitionRule {
            from: DealStatus::Draft,
            action: ChangeType::Submit,
            roles: &[
                Role::PropertyConsultant,
                Role::SalesManager,
                Role::FinancialManager,
                Role::FinancialAdmin,
                Role::Admin,
            ],
            to: DealStatus::PendingApproval,
        },
        TransitionRule {
            from: DealStatus::PendingApproval,
            action: ChangeType::ApproveFm,
            roles: &[Role::FinancialManager, Role::TopManagement, Role::Admin],
            to: DealStatus::Approved,
        },
        TransitionRule {
            from: DealStatus::PendingApproval,
            action: ChangeType::Reject,
            roles: &[Role::FinancialManager, Role::TopManagement, Role::Admin],
            to: DealStatus::Rejected,
        },
    ],
};

/// Parameters for creating a deal from a calculator snapshot.
#[derive(Debug, Clone)]
pub struct CreateDealRequest {
    pub title: String,
    pub amount: Decimal,
    pub details: serde_json::Value,
}

pub struct DealService {
    pool: PgPool,
    sink: Arc<dyn NotificationSink>,
}

impl DealService {
    pub fn new(pool: PgPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, sink }
    }

    /// Create a draft deal. The snapshot must decode; a rejecting
    /// evaluation marks the deal as needing an authority override.
    pub async fn create(
        &self,
        principal: Principal,
        request: CreateDealRequest,
    ) -> DealdeskResult<Deal> {
        if request.title.trim().is_empty() {
            return Err(DealdeskError::invalid_field("title", "Title is required"));
        }
        if request.amount <= Decimal::ZERO {
            return Err(DealdeskError::invalid_field(
                "amount",
                "Amount must be positive",
            ));
        }
        let snapshot = Snapshot::from_blob(&request.details).map_err(|_| {
            DealdeskError::invalid_field("details", "Details are not a valid calculator snapshot")
        })?;

        let deal = Deal {
            id: Uuid::new_v4(),
            title: request.title,
            amount: request.amount,
            status: DealStatus::Draft,
            needs_override: !snapshot.evaluator_accepted(),
            override_approved_at: None,
            fm_review_at: None,
            created_by: principal.user_id,
            created_at: Utc::now(),
            details: request.details,
        };

        let mut tx = serializable_tx(&self.pool).await?;
        repo::deals::insert(&mut tx, &deal).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Deal,
            &HistoryEntry::new(deal.id, ChangeType::Create, principal.user_id).with_new(json!({
                "status": deal.status.as_str(),
                "needs_override": deal.needs_override,
            })),
        )
        .await?;
        tx.commit().await.db()?;

        info!(deal_id = %deal.id, needs_override = deal.needs_override, "deal created");
        Ok(deal)
    }

    pub async fn submit(&self, principal: Principal, deal_id: Uuid) -> DealdeskResult<Deal> {
        let mut tx = serializable_tx(&self.pool).await?;
        let deal = repo::deals::find_by_id_for_update(&mut tx, deal_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Deal"))?;
        let next = DEAL_TABLE.resolve(deal.status, ChangeType::Submit, principal.role)?;

        repo::deals::update_status(&mut tx, deal_id, next).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Deal,
            &HistoryEntry::new(deal_id, ChangeType::Submit, principal.user_id)
                .with_old(json!({ "status": deal.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::deal_submitted(deal_id);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(Deal {
            status: next,
            ..deal
        })
    }

    /// Approve a submitted deal. Permitted only when the frozen
    /// evaluation accepted the schedule, or the required override was
    /// granted.
    pub async fn approve(&self, principal: Principal, deal_id: Uuid) -> DealdeskResult<Deal> {
        let now = Utc::now();
        let mut tx = serializable_tx(&self.pool).await?;
        let deal = repo::deals::find_by_id_for_update(&mut tx, deal_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Deal"))?;
        let next = DEAL_TABLE.resolve(deal.status, ChangeType::ApproveFm, principal.role)?;

        let snapshot = Snapshot::from_blob(&deal.details)?;
        if !deal.approvable(snapshot.evaluator_accepted()) {
            return Err(DealdeskError::invariant(
                "Deal was rejected by evaluation and has no approved override",
            ));
        }

        repo::deals::update_status(&mut tx, deal_id, next).await?;
        if principal.role == Role::FinancialManager {
            repo::deals::set_fm_review(&mut tx, deal_id, now).await?;
        }
        repo::history::append(
            &mut tx,
            EntityKind::Deal,
            &HistoryEntry::new(deal_id, ChangeType::ApproveFm, principal.user_id)
                .with_old(json!({ "status": deal.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::deal_decided(deal_id, deal.created_by, true);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(Deal {
            status: next,
            ..deal
        })
    }

    pub async fn reject(&self, principal: Principal, deal_id: Uuid) -> DealdeskResult<Deal> {
        let mut tx = serializable_tx(&self.pool).await?;
        let deal = repo::deals::find_by_id_for_update(&mut tx, deal_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Deal"))?;
        let next = DEAL_TABLE.resolve(deal.status, ChangeType::Reject, principal.role)?;

        repo::deals::update_status(&mut tx, deal_id, next).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Deal,
            &HistoryEntry::new(deal_id, ChangeType::Reject, principal.user_id)
                .with_old(json!({ "status": deal.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::deal_decided(deal_id, deal.created_by, false);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(Deal {
            status: next,
            ..deal
        })
    }

    /// TM grants the authority override a rejected evaluation requires.
    /// Does not change the deal status by itself.
    pub async fn approve_override(
        &self,
        principal: Principal,
        deal_id: Uuid,
    ) -> DealdeskResult<Deal> {
        if principal.role != Role::TopManagement {
            return Err(DealdeskError::forbidden(
                "Only top management may approve an override",
            ));
        }

        let now = Utc::now();
        let mut tx = serializable_tx(&self.pool).await?;
        let deal = repo::deals::find_by_id_for_update(&mut tx, deal_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Deal"))?;
        if !deal.needs_override {
            return Err(DealdeskError::state_mismatch(
                "Deal does not require an override",
            ));
        }
        if deal.override_approved_at.is_some() {
            return Err(DealdeskError::state_mismatch("Override is already approved"));
        }

        repo::deals::set_override_approved(&mut tx, deal_id, now).await?;
        repo::history::append(
            &mut tx,
            EntityKind::Deal,
            &HistoryEntry::new(deal_id, ChangeType::ApproveOverride, principal.user_id)
                .with_new(json!({ "override_approved_at": now })),
        )
        .await?;

        tx.commit().await.db()?;
        info!(deal_id = %deal_id, "deal override approved");
        Ok(Deal {
            override_approved_at: Some(now),
            ..deal
        })
    }

    pub async fn get(&self, deal_id: Uuid) -> DealdeskResult<Deal> {
        let mut conn = self.pool.acquire().await.db()?;
        repo::deals::find_by_id(&mut conn, deal_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Deal"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_table() {
        let next = DEAL_TABLE
            .resolve(DealStatus::Draft, ChangeType::Submit, Role::PropertyConsultant)
            .unwrap();
        assert_eq!(next, DealStatus::PendingApproval);

        // consultants submit but do not approve
        assert!(DEAL_TABLE
            .resolve(
                DealStatus::PendingApproval,
                ChangeType::ApproveFm,
                Role::PropertyConsultant
            )
            .is_err());

        let err = DEAL_TABLE
            .resolve(DealStatus::Approved, ChangeType::Submit, Role::Admin)
            .unwrap_err();
        assert_eq!(err.to_string(), "Deal is not draft");
    }
}
