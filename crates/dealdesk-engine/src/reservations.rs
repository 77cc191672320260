//! Reservation forms: gate-checked creation, FM approval flipping the
//! unit to RESERVED, and the amendment sub-protocol on approved forms.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use dealdesk_core::models::{
    AmendmentRecord, AmendmentRequest, ChangeType, EntityKind, HistoryEntry, NotificationKind,
    PlanStatus, Principal, ReservationDetails, ReservationForm, ReservationStatus, Role, Snapshot,
    UnitStatus,
};
use dealdesk_core::{DealdeskError, DealdeskResult};
use dealdesk_store::{repo, serializable_tx, SqlxResultExt};

use crate::machine::{TransitionRule, TransitionTable};
use crate::notify::{dispatch, router, NotificationSink};

const RESERVATION_TABLE: TransitionTable<ReservationStatus> = TransitionTable {
    entity: "Reservation form",
    rules: &[
        TransitionRule {
            from: ReservationStatus::PendingApproval,
            action: ChangeType::ApproveFm,
            roles: &[Role::FinancialManager, Role::Admin],
            to: ReservationStatus::Approved,
        },
        TransitionRule {
            from: ReservationStatus::PendingApproval,
            action: ChangeType::Reject,
            roles: &[Role::FinancialManager, Role::Admin],
            to: ReservationStatus::Rejected,
        },
        TransitionRule {
            from: ReservationStatus::PendingApproval,
            action: ChangeType::Cancel,
            roles: &[Role::FinancialAdmin, Role::FinancialManager, Role::Admin],
            to: ReservationStatus::Cancelled,
        },
    ],
};

/// Parameters for creating a reservation form.
#[derive(Debug, Clone)]
pub struct CreateReservationRequest {
    pub payment_plan_id: Uuid,
    pub reservation_date: NaiveDate,
    pub preliminary_payment: Decimal,
}

/// Parameters for an amendment on an approved form.
#[derive(Debug, Clone)]
pub struct AmendmentInput {
    pub new_reservation_date: NaiveDate,
    pub new_preliminary_payment: Decimal,
    pub reason: String,
}

pub struct ReservationService {
    pool: PgPool,
    sink: Arc<dyn NotificationSink>,
}

impl ReservationService {
    pub fn new(pool: PgPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self { pool, sink }
    }

    /// Create a form for an approved plan on its blocked unit. The gate
    /// matrix: plan approved, unit BLOCKED under an active approved
    /// block, and no other pending/approved form on the plan.
    pub async fn create(
        &self,
        principal: Principal,
        request: CreateReservationRequest,
    ) -> DealdeskResult<ReservationForm> {
        if !matches!(
            principal.role,
            Role::FinancialAdmin | Role::FinancialManager | Role::Admin
        ) {
            return Err(DealdeskError::forbidden(format!(
                "Role {} may not create reservation forms",
                principal.role
            )));
        }
        if request.preliminary_payment < Decimal::ZERO {
            return Err(DealdeskError::invalid_field(
                "preliminary_payment",
                "Preliminary payment cannot be negative",
            ));
        }

        let now = Utc::now();
        let mut tx = serializable_tx(&self.pool).await?;

        let plan = repo::plans::find_by_id_for_update(&mut tx, request.payment_plan_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Payment plan"))?;
        if plan.status != PlanStatus::Approved {
            return Err(DealdeskError::invariant(
                "Reservation forms require an approved payment plan",
            ));
        }
        if repo::reservations::occupying_form_exists(&mut tx, plan.id).await? {
            return Err(DealdeskError::invariant(
                "A reservation form already exists for this payment plan",
            ));
        }

        let snapshot = Snapshot::from_blob(&plan.details)?;
        let unit_id = snapshot
            .payload()
            .unit
            .as_ref()
            .map(|u| u.unit_id)
            .ok_or_else(|| {
                DealdeskError::invariant("Payment plan carries no unit to reserve")
            })?;

        let unit = repo::units::find_by_id_for_update(&mut tx, unit_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Unit"))?;
        if unit.unit_status != UnitStatus::Blocked || unit.available {
            return Err(DealdeskError::invariant(
                "Reservation forms can only be created for units that are currently BLOCKED",
            ));
        }
        if repo::blocks::find_active_for_unit(&mut tx, unit.id, now)
            .await?
            .is_none()
        {
            return Err(DealdeskError::invariant(
                "The unit's block has expired; request a new block first",
            ));
        }

        let form = ReservationForm {
            id: Uuid::new_v4(),
            payment_plan_id: plan.id,
            unit_id: unit.id,
            reservation_date: request.reservation_date,
            preliminary_payment: request.preliminary_payment,
            status: ReservationStatus::PendingApproval,
            details: ReservationDetails::default(),
            created_by: principal.user_id,
            created_at: now,
        };
        repo::reservations::insert(&mut tx, &form).await?;
        repo::history::append(
            &mut tx,
            EntityKind::ReservationForm,
            &HistoryEntry::new(form.id, ChangeType::Create, principal.user_id)
                .with_new(json!({ "status": form.status.as_str(), "unit_id": unit.id })),
        )
        .await?;
        let events = router::reservation_created(form.id);

        tx.commit().await.db()?;
        info!(form_id = %form.id, plan_id = %plan.id, "reservation form created");
        dispatch(self.sink.as_ref(), events).await;
        Ok(form)
    }

    /// FM approval: the unit moves from BLOCKED to RESERVED.
    pub async fn approve(
        &self,
        principal: Principal,
        form_id: Uuid,
    ) -> DealdeskResult<ReservationForm> {
        let mut tx = serializable_tx(&self.pool).await?;
        let form = repo::reservations::find_by_id_for_update(&mut tx, form_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Reservation form"))?;
        let next = RESERVATION_TABLE.resolve(form.status, ChangeType::ApproveFm, principal.role)?;

        let unit = repo::units::find_by_id_for_update(&mut tx, form.unit_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Unit"))?;
        if unit.unit_status != UnitStatus::Blocked {
            return Err(DealdeskError::invariant(
                "Unit must be BLOCKED to approve the reservation",
            ));
        }

        repo::reservations::update_status(&mut tx, form_id, next).await?;
        repo::units::set_state(&mut tx, unit.id, UnitStatus::Reserved).await?;
        repo::history::append(
            &mut tx,
            EntityKind::ReservationForm,
            &HistoryEntry::new(form_id, ChangeType::ApproveFm, principal.user_id)
                .with_old(json!({ "status": form.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::reservation_decided(
            form_id,
            form.created_by,
            NotificationKind::ReservationApproved,
            "The reservation form was approved and the unit is reserved",
        );

        tx.commit().await.db()?;
        info!(form_id = %form_id, unit_id = %unit.id, "reservation approved, unit reserved");
        dispatch(self.sink.as_ref(), events).await;
        Ok(ReservationForm {
            status: next,
            ..form
        })
    }

    pub async fn reject(
        &self,
        principal: Principal,
        form_id: Uuid,
    ) -> DealdeskResult<ReservationForm> {
        self.simple_transition(
            principal,
            form_id,
            ChangeType::Reject,
            NotificationKind::ReservationRejected,
            "The reservation form was rejected",
        )
        .await
    }

    pub async fn cancel(
        &self,
        principal: Principal,
        form_id: Uuid,
    ) -> DealdeskResult<ReservationForm> {
        self.simple_transition(
            principal,
            form_id,
            ChangeType::Cancel,
            NotificationKind::ReservationCancelled,
            "The reservation form was cancelled",
        )
        .await
    }

    async fn simple_transition(
        &self,
        principal: Principal,
        form_id: Uuid,
        action: ChangeType,
        kind: NotificationKind,
        message: &str,
    ) -> DealdeskResult<ReservationForm> {
        let mut tx = serializable_tx(&self.pool).await?;
        let form = repo::reservations::find_by_id_for_update(&mut tx, form_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Reservation form"))?;
        let next = RESERVATION_TABLE.resolve(form.status, action, principal.role)?;

        repo::reservations::update_status(&mut tx, form_id, next).await?;
        repo::history::append(
            &mut tx,
            EntityKind::ReservationForm,
            &HistoryEntry::new(form_id, action, principal.user_id)
                .with_old(json!({ "status": form.status.as_str() }))
                .with_new(json!({ "status": next.as_str() })),
        )
        .await?;
        let events = router::reservation_decided(form_id, form.created_by, kind, message);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(ReservationForm {
            status: next,
            ..form
        })
    }

    /// FA posts an amendment request on an approved form. Only one may
    /// be pending at a time.
    pub async fn request_amendment(
        &self,
        principal: Principal,
        form_id: Uuid,
        input: AmendmentInput,
    ) -> DealdeskResult<ReservationForm> {
        if !matches!(
            principal.role,
            Role::FinancialAdmin | Role::FinancialManager | Role::Admin
        ) {
            return Err(DealdeskError::forbidden(format!(
                "Role {} may not request amendments",
                principal.role
            )));
        }
        if input.new_preliminary_payment < Decimal::ZERO {
            return Err(DealdeskError::invalid_field(
                "new_preliminary_payment",
                "Preliminary payment cannot be negative",
            ));
        }

        let mut tx = serializable_tx(&self.pool).await?;
        let mut form = repo::reservations::find_by_id_for_update(&mut tx, form_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Reservation form"))?;
        if form.status != ReservationStatus::Approved {
            return Err(DealdeskError::state_mismatch(
                "Reservation form is not approved",
            ));
        }
        if form.has_pending_amendment() {
            return Err(DealdeskError::state_mismatch(
                "An amendment request is already pending",
            ));
        }

        let request = AmendmentRequest {
            new_reservation_date: input.new_reservation_date,
            new_preliminary_payment: input.new_preliminary_payment,
            reason: input.reason,
            requested_by: principal.user_id,
            requested_at: Utc::now(),
        };
        form.details.amendment_request = Some(request.clone());
        repo::reservations::update_details(&mut tx, form_id, &form.details).await?;
        repo::history::append(
            &mut tx,
            EntityKind::ReservationForm,
            &HistoryEntry::new(form_id, ChangeType::RequestAmendment, principal.user_id)
                .with_new(serde_json::to_value(&request)?),
        )
        .await?;
        let events = router::amendment_requested(form_id);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(form)
    }

    /// FM applies the pending amendment; the prior values are archived
    /// into the amendment history.
    pub async fn approve_amendment(
        &self,
        principal: Principal,
        form_id: Uuid,
    ) -> DealdeskResult<ReservationForm> {
        self.decide_amendment(principal, form_id, true).await
    }

    /// FM rejects the pending amendment; the attempt is archived.
    pub async fn reject_amendment(
        &self,
        principal: Principal,
        form_id: Uuid,
    ) -> DealdeskResult<ReservationForm> {
        self.decide_amendment(principal, form_id, false).await
    }

    async fn decide_amendment(
        &self,
        principal: Principal,
        form_id: Uuid,
        apply: bool,
    ) -> DealdeskResult<ReservationForm> {
        if !matches!(principal.role, Role::FinancialManager | Role::Admin) {
            return Err(DealdeskError::forbidden(format!(
                "Role {} may not decide amendments",
                principal.role
            )));
        }

        let mut tx = serializable_tx(&self.pool).await?;
        let mut form = repo::reservations::find_by_id_for_update(&mut tx, form_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Reservation form"))?;
        let request = form.details.amendment_request.take().ok_or_else(|| {
            DealdeskError::state_mismatch("No amendment request is pending")
        })?;

        let record = AmendmentRecord {
            request: request.clone(),
            previous_reservation_date: form.reservation_date,
            previous_preliminary_payment: form.preliminary_payment,
            applied: apply,
            decided_by: principal.user_id,
            decided_at: Utc::now(),
        };
        form.details.amendment_history.push(record.clone());

        let (change, kind, message) = if apply {
            form.reservation_date = request.new_reservation_date;
            form.preliminary_payment = request.new_preliminary_payment;
            repo::reservations::apply_amendment(
                &mut tx,
                form_id,
                form.reservation_date,
                form.preliminary_payment,
                &form.details,
            )
            .await?;
            (
                ChangeType::ApproveAmendment,
                NotificationKind::AmendmentApproved,
                "The reservation amendment was applied",
            )
        } else {
            repo::reservations::update_details(&mut tx, form_id, &form.details).await?;
            (
                ChangeType::RejectAmendment,
                NotificationKind::AmendmentRejected,
                "The reservation amendment was rejected",
            )
        };

        repo::history::append(
            &mut tx,
            EntityKind::ReservationForm,
            &HistoryEntry::new(form_id, change, principal.user_id)
                .with_old(json!({
                    "reservation_date": record.previous_reservation_date,
                    "preliminary_payment": record.previous_preliminary_payment,
                }))
                .with_new(serde_json::to_value(&request)?),
        )
        .await?;
        let events = router::reservation_decided(form_id, request.requested_by, kind, message);

        tx.commit().await.db()?;
        dispatch(self.sink.as_ref(), events).await;
        Ok(form)
    }

    pub async fn get(&self, form_id: Uuid) -> DealdeskResult<ReservationForm> {
        let mut conn = self.pool.acquire().await.db()?;
        repo::reservations::find_by_id(&mut conn, form_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Reservation form"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_table() {
        assert!(RESERVATION_TABLE
            .resolve(
                ReservationStatus::PendingApproval,
                ChangeType::ApproveFm,
                Role::FinancialManager
            )
            .is_ok());
        // approved forms are amended, never cancelled
        assert!(RESERVATION_TABLE
            .resolve(
                ReservationStatus::Approved,
                ChangeType::Cancel,
                Role::FinancialAdmin
            )
            .is_err());
        let err = RESERVATION_TABLE
            .resolve(
                ReservationStatus::Approved,
                ChangeType::ApproveFm,
                Role::FinancialManager,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Reservation form is not pending approval");
    }
}
