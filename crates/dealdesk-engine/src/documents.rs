//! Document contexts for external rendering.
//!
//! Producing a document is a read, but it is gated exactly like the
//! transitions that would consume it: a reservation document requires an
//! approved form, a contract document an approved deal (with its
//! override, when one was needed). Rendering itself is external.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use dealdesk_core::models::{DealStatus, Principal, ReservationStatus, Snapshot};
use dealdesk_core::numwords::amount_in_words;
use dealdesk_core::{DealdeskError, DealdeskResult};
use dealdesk_evaluator::with_due_dates;
use dealdesk_store::{repo, SqlxResultExt};

pub struct DocumentService {
    pool: PgPool,
    currency: String,
}

impl DocumentService {
    pub fn new(pool: PgPool, currency: String) -> Self {
        Self { pool, currency }
    }

    /// Context for a reservation document: the plan snapshot with due
    /// dates resolved against the reservation date and written amounts.
    pub async fn reservation_context(
        &self,
        _principal: Principal,
        form_id: Uuid,
    ) -> DealdeskResult<serde_json::Value> {
        let mut conn = self.pool.acquire().await.db()?;
        let form = repo::reservations::find_by_id(&mut conn, form_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Reservation form"))?;
        if form.status != ReservationStatus::Approved {
            return Err(DealdeskError::state_mismatch(
                "Reservation form is not approved",
            ));
        }

        let plan = repo::plans::find_by_id(&mut conn, form.payment_plan_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Payment plan"))?;
        let snapshot = Snapshot::from_blob(&plan.details)?;
        let payload = snapshot.payload();

        let dated = payload
            .generated_plan
            .as_ref()
            .map(|g| with_due_dates(&g.schedule, form.reservation_date, &self.currency));

        Ok(json!({
            "reservation_form_id": form.id,
            "reservation_date": form.reservation_date,
            "preliminary_payment": form.preliminary_payment,
            "preliminary_payment_in_words":
                amount_in_words(form.preliminary_payment, &self.currency),
            "buyers": payload.buyers,
            "unit": payload.unit,
            "schedule": dated,
            "amendment_history": form.details.amendment_history,
        }))
    }

    /// Context for a contract document. The owning deal must be
    /// approved; a deal that needed an override must carry the approval
    /// timestamp.
    pub async fn contract_context(
        &self,
        _principal: Principal,
        contract_id: Uuid,
    ) -> DealdeskResult<serde_json::Value> {
        let mut conn = self.pool.acquire().await.db()?;
        let contract = repo::contracts::find_by_id(&mut conn, contract_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Contract"))?;
        let form = repo::reservations::find_by_id(&mut conn, contract.reservation_form_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Reservation form"))?;
        let plan = repo::plans::find_by_id(&mut conn, form.payment_plan_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Payment plan"))?;
        let deal = repo::deals::find_by_id(&mut conn, plan.deal_id)
            .await?
            .ok_or_else(|| DealdeskError::not_found("Deal"))?;

        if deal.status != DealStatus::Approved {
            return Err(DealdeskError::state_mismatch(
                "Contract documents require an approved deal",
            ));
        }
        if deal.needs_override && deal.override_approved_at.is_none() {
            return Err(DealdeskError::invariant(
                "Deal requires an approved override before document generation",
            ));
        }

        let snapshot = Snapshot::from_blob(&contract.details)?;
        let payload = snapshot.payload();
        let start_date = contract
            .settings
            .contract_date
            .unwrap_or(form.reservation_date);
        let dated = payload
            .generated_plan
            .as_ref()
            .map(|g| with_due_dates(&g.schedule, start_date, &self.currency));

        Ok(json!({
            "contract_id": contract.id,
            "contract_date": contract.settings.contract_date,
            "power_of_attorney": contract.settings.power_of_attorney,
            "deal_title": deal.title,
            "deal_amount": deal.amount,
            "deal_amount_in_words": amount_in_words(deal.amount, &self.currency),
            "buyers": payload.buyers,
            "unit": payload.unit,
            "schedule": dated,
        }))
    }
}
