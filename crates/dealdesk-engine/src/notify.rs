//! Notification routing and delivery.
//!
//! Services stage events while their transaction is open and hand them to
//! the sink only after commit. Sink failures are logged and never surface
//! into the business operation.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error};

use dealdesk_core::models::{NotificationEvent, RecipientCriteria};
use dealdesk_core::DealdeskResult;
use dealdesk_store::{repo, SqlxResultExt};

/// Destination for notification events.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &NotificationEvent) -> DealdeskResult<()>;
}

/// Postgres outbox sink: expands role criteria to active users and
/// writes one row per recipient. Transport pickup is external.
pub struct PgNotificationSink {
    pool: PgPool,
}

impl PgNotificationSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for PgNotificationSink {
    async fn deliver(&self, event: &NotificationEvent) -> DealdeskResult<()> {
        let mut conn = self.pool.acquire().await.db()?;
        let user_ids = match &event.recipients {
            RecipientCriteria::Users(ids) => ids.clone(),
            RecipientCriteria::Roles(roles) => {
                repo::users::active_ids_by_roles(&mut conn, roles).await?
            }
        };
        for user_id in user_ids {
            repo::notifications::insert_for_user(&mut conn, user_id, event).await?;
        }
        Ok(())
    }
}

/// Logging sink for tests and headless tooling.
#[derive(Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, event: &NotificationEvent) -> DealdeskResult<()> {
        debug!(kind = event.kind.as_str(), ref_id = %event.ref_id, "notification");
        Ok(())
    }
}

/// Post-commit dispatch. Failures must not roll anything back, so they
/// are logged per event and swallowed.
pub async fn dispatch(sink: &dyn NotificationSink, events: Vec<NotificationEvent>) {
    for event in events {
        if let Err(e) = sink.deliver(&event).await {
            error!(
                kind = event.kind.as_str(),
                ref_id = %event.ref_id,
                "notification delivery failed: {e}"
            );
        }
    }
}

/// Pure transition-to-event mapping.
pub mod router {
    use uuid::Uuid;

    use dealdesk_core::models::{
        EntityKind, NotificationEvent, NotificationKind, RecipientCriteria, Role,
    };

    fn to_roles(
        roles: &[Role],
        kind: NotificationKind,
        entity: EntityKind,
        id: Uuid,
        message: String,
    ) -> NotificationEvent {
        NotificationEvent::new(
            RecipientCriteria::roles(roles.iter().copied()),
            kind,
            entity,
            id,
            message,
        )
    }

    fn to_user(
        user: Uuid,
        kind: NotificationKind,
        entity: EntityKind,
        id: Uuid,
        message: String,
    ) -> NotificationEvent {
        NotificationEvent::new(RecipientCriteria::user(user), kind, entity, id, message)
    }

    pub fn plan_submitted(plan_id: Uuid, queue_role: Role) -> Vec<NotificationEvent> {
        vec![to_roles(
            &[queue_role],
            NotificationKind::PlanSubmitted,
            EntityKind::PaymentPlan,
            plan_id,
            "A payment plan is awaiting your review".to_string(),
        )]
    }

    pub fn plan_forwarded(plan_id: Uuid, next_role: Role) -> Vec<NotificationEvent> {
        vec![to_roles(
            &[next_role],
            NotificationKind::PlanSubmitted,
            EntityKind::PaymentPlan,
            plan_id,
            "A payment plan has entered your approval queue".to_string(),
        )]
    }

    pub fn plan_escalated(plan_id: Uuid, creator: Uuid) -> Vec<NotificationEvent> {
        vec![
            to_roles(
                &[Role::TopManagement],
                NotificationKind::PlanEscalated,
                EntityKind::PaymentPlan,
                plan_id,
                "A payment plan exceeds the policy discount limit and needs your approval"
                    .to_string(),
            ),
            to_user(
                creator,
                NotificationKind::PlanEscalated,
                EntityKind::PaymentPlan,
                plan_id,
                "Your payment plan was escalated to top management".to_string(),
            ),
        ]
    }

    pub fn plan_decided(plan_id: Uuid, creator: Uuid, approved: bool) -> Vec<NotificationEvent> {
        let (kind, message) = if approved {
            (
                NotificationKind::PlanApproved,
                "Your payment plan was approved",
            )
        } else {
            (
                NotificationKind::PlanRejected,
                "Your payment plan was rejected",
            )
        };
        vec![to_user(
            creator,
            kind,
            EntityKind::PaymentPlan,
            plan_id,
            message.to_string(),
        )]
    }

    pub fn plan_accepted(plan_id: Uuid, creator: Uuid) -> Vec<NotificationEvent> {
        vec![to_user(
            creator,
            NotificationKind::PlanAccepted,
            EntityKind::PaymentPlan,
            plan_id,
            "Your payment plan was marked as the accepted plan".to_string(),
        )]
    }

    pub fn deal_submitted(deal_id: Uuid) -> Vec<NotificationEvent> {
        vec![to_roles(
            &[Role::FinancialManager, Role::TopManagement],
            NotificationKind::DealSubmitted,
            EntityKind::Deal,
            deal_id,
            "A deal was submitted for approval".to_string(),
        )]
    }

    pub fn deal_decided(deal_id: Uuid, creator: Uuid, approved: bool) -> Vec<NotificationEvent> {
        let (kind, message) = if approved {
            (NotificationKind::DealApproved, "Your deal was approved")
        } else {
            (NotificationKind::DealRejected, "Your deal was rejected")
        };
        vec![to_user(
            creator,
            kind,
            EntityKind::Deal,
            deal_id,
            message.to_string(),
        )]
    }

    pub fn block_requested(block_id: Uuid) -> Vec<NotificationEvent> {
        vec![to_roles(
            &[Role::FinancialManager],
            NotificationKind::BlockRequested,
            EntityKind::Block,
            block_id,
            "A unit block request is awaiting financial approval".to_string(),
        )]
    }

    pub fn block_decided(block_id: Uuid, requester: Uuid, approved: bool) -> Vec<NotificationEvent> {
        let (kind, message) = if approved {
            (
                NotificationKind::BlockApproved,
                "Your block request was approved",
            )
        } else {
            (
                NotificationKind::BlockRejected,
                "Your block request was rejected",
            )
        };
        vec![to_user(
            requester,
            kind,
            EntityKind::Block,
            block_id,
            message.to_string(),
        )]
    }

    pub fn block_extended(block_id: Uuid, requester: Uuid) -> Vec<NotificationEvent> {
        vec![to_user(
            requester,
            NotificationKind::BlockExtended,
            EntityKind::Block,
            block_id,
            "Your unit block was extended".to_string(),
        )]
    }

    pub fn block_expired(block_id: Uuid, requester: Uuid) -> Vec<NotificationEvent> {
        vec![
            to_roles(
                &[Role::FinancialManager],
                NotificationKind::BlockExpired,
                EntityKind::Block,
                block_id,
                "A unit block expired and the unit returned to inventory".to_string(),
            ),
            to_user(
                requester,
                NotificationKind::BlockExpired,
                EntityKind::Block,
                block_id,
                "Your unit block expired".to_string(),
            ),
        ]
    }

    pub fn block_hold_reminder(block_id: Uuid) -> Vec<NotificationEvent> {
        vec![to_roles(
            &[Role::FinancialManager],
            NotificationKind::BlockHoldReminder,
            EntityKind::Block,
            block_id,
            "A unit is still held by an active block".to_string(),
        )]
    }

    pub fn block_override_stage(block_id: Uuid, next_role: Option<Role>) -> Vec<NotificationEvent> {
        match next_role {
            Some(role) => vec![to_roles(
                &[role],
                NotificationKind::BlockOverridePending,
                EntityKind::Block,
                block_id,
                "A block override is awaiting your approval".to_string(),
            )],
            None => Vec::new(),
        }
    }

    pub fn block_override_decided(
        block_id: Uuid,
        requester: Uuid,
        approved: bool,
    ) -> Vec<NotificationEvent> {
        let (kind, message) = if approved {
            (
                NotificationKind::BlockOverrideApproved,
                "The block override was approved",
            )
        } else {
            (
                NotificationKind::BlockOverrideRejected,
                "The block override was rejected",
            )
        };
        vec![to_user(
            requester,
            kind,
            EntityKind::Block,
            block_id,
            message.to_string(),
        )]
    }

    pub fn reservation_created(form_id: Uuid) -> Vec<NotificationEvent> {
        vec![to_roles(
            &[Role::FinancialManager],
            NotificationKind::ReservationCreated,
            EntityKind::ReservationForm,
            form_id,
            "A reservation form is awaiting approval".to_string(),
        )]
    }

    pub fn reservation_decided(
        form_id: Uuid,
        creator: Uuid,
        kind: NotificationKind,
        message: &str,
    ) -> Vec<NotificationEvent> {
        vec![to_user(
            creator,
            kind,
            EntityKind::ReservationForm,
            form_id,
            message.to_string(),
        )]
    }

    pub fn amendment_requested(form_id: Uuid) -> Vec<NotificationEvent> {
        vec![to_roles(
            &[Role::FinancialManager],
            NotificationKind::AmendmentRequested,
            EntityKind::ReservationForm,
            form_id,
            "A reservation amendment is awaiting approval".to_string(),
        )]
    }

    pub fn contract_stage(
        contract_id: Uuid,
        kind: NotificationKind,
        roles: &[Role],
        message: &str,
    ) -> Vec<NotificationEvent> {
        vec![to_roles(
            roles,
            kind,
            EntityKind::Contract,
            contract_id,
            message.to_string(),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::router;
    use dealdesk_core::models::{NotificationKind, RecipientCriteria, Role};
    use uuid::Uuid;

    #[test]
    fn test_block_expired_targets_fms_and_requester() {
        let block = Uuid::new_v4();
        let requester = Uuid::new_v4();
        let events = router::block_expired(block, requester);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].recipients,
            RecipientCriteria::Roles(vec![Role::FinancialManager])
        );
        assert_eq!(events[1].recipients, RecipientCriteria::Users(vec![requester]));
        assert!(events
            .iter()
            .all(|e| e.kind == NotificationKind::BlockExpired && e.ref_id == block));
    }

    #[test]
    fn test_escalation_notifies_tm_and_creator() {
        let events = router::plan_escalated(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].recipients,
            RecipientCriteria::Roles(vec![Role::TopManagement])
        );
    }
}
